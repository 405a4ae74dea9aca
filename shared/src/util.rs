/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Minutes → milliseconds
pub const fn minutes_to_millis(minutes: i64) -> i64 {
    minutes * 60 * 1000
}

/// Format a Unix millis timestamp as RFC 3339 (UTC), for log output
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
