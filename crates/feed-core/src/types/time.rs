//! 타임스탬프 변환 유틸리티.
//!
//! 엔티티의 타임스탬프는 epoch 밀리초(`i64`)로 보관합니다.

use chrono::{DateTime, Utc};

/// ISO-8601 문자열을 epoch 밀리초로 변환합니다.
pub fn parse_iso8601(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
}

/// epoch 밀리초를 `DateTime<Utc>`로 변환합니다.
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// 현재 시각(epoch 밀리초).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 현재 시각(epoch 초).
pub fn now_seconds() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso8601() {
        assert_eq!(parse_iso8601("2022-01-01T00:00:00Z"), Some(1_640_995_200_000));
        assert_eq!(parse_iso8601("2022-04-12T08:17:05.932Z"), Some(1_649_751_425_932));
        assert_eq!(parse_iso8601("not a date"), None);
    }

    #[test]
    fn test_millis_roundtrip() {
        let dt = millis_to_datetime(1_640_995_200_000).unwrap();
        assert_eq!(dt.to_rfc3339(), "2022-01-01T00:00:00+00:00");
    }
}
