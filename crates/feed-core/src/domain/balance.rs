//! 계좌 잔고.
//!
//! 금액은 반올림 오차를 피하기 위해 거래소가 보낸 Decimal 문자열 그대로
//! 보관합니다.

use crate::types::decimal_string_sub;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 통화별 계좌 잔고.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// 사용 가능한 잔고
    pub free: Option<String>,
    /// 주문에 묶인 잔고 (총 잔고 - 사용 가능)
    pub used: Option<String>,
    /// 총 잔고
    pub total: Option<String>,
}

impl Account {
    /// 사용 가능/총 잔고로 계좌를 생성합니다.
    pub fn new(free: Option<String>, total: Option<String>) -> Self {
        let mut account = Self {
            free,
            used: None,
            total,
        };
        account.normalize();
        account
    }

    /// 사용 가능/총 잔고가 모두 있으면 묶인 잔고를 다시 계산합니다.
    pub fn normalize(&mut self) {
        if let (Some(free), Some(total)) = (&self.free, &self.total) {
            self.used = decimal_string_sub(total, free);
        }
    }
}

/// 통화 코드별 잔고 집합.
///
/// 메시지에 포함되지 않은 통화는 이전 값을 유지합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// 통화 코드 → 계좌
    pub accounts: BTreeMap<String, Account>,
    /// 마지막 갱신 시각 (epoch 밀리초)
    pub timestamp: Option<i64>,
}

impl Balance {
    /// 빈 잔고를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 한 통화의 계좌를 교체합니다. 다른 통화는 건드리지 않습니다.
    pub fn merge_account(&mut self, code: impl Into<String>, mut account: Account) {
        account.normalize();
        self.accounts.insert(code.into(), account);
    }

    /// 통화 코드로 계좌를 조회합니다.
    pub fn get(&self, code: &str) -> Option<&Account> {
        self.accounts.get(code)
    }

    /// 사용 가능 잔고.
    pub fn free(&self, code: &str) -> Option<&str> {
        self.get(code).and_then(|a| a.free.as_deref())
    }

    /// 총 잔고.
    pub fn total(&self, code: &str) -> Option<&str> {
        self.get(code).and_then(|a| a.total.as_deref())
    }

    /// 보유 중인 통화 코드 목록.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.accounts.keys().map(String::as_str)
    }

    /// 통화 수.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
