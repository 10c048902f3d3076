use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time as fractional seconds since the Unix epoch
pub fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs_f64()
}

/// Value of the HTTP `Date` header for the current instant
pub fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_time_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(unix_time_secs() > 1_577_836_800.0);
    }

    #[test]
    fn test_http_date_format() {
        let date = http_date();
        assert!(date.ends_with(" GMT"));
        assert_eq!(date.split_whitespace().count(), 6);
    }
}
