//! Human-readable formatting for sizes, durations, and timestamps.

use time::OffsetDateTime;

const KB: u64 = 1000;
const MB: u64 = KB * 1000;
const GB: u64 = MB * 1000;
const TB: u64 = GB * 1000;

/// Formats a byte count with a decimal unit suffix.
pub fn human_bytes(size: u64) -> String {
    match size {
        s if s >= TB => format!("{:.1} TB", s as f64 / TB as f64),
        s if s >= GB => format!("{:.1} GB", s as f64 / GB as f64),
        s if s >= MB => format!("{:.1} MB", s as f64 / MB as f64),
        s if s >= KB => format!("{:.1} KB", s as f64 / KB as f64),
        s => format!("{s} B"),
    }
}

/// Formats a nanosecond duration at a precision suited to its magnitude.
pub fn human_duration(nanos: u64) -> String {
    if nanos >= 1_000_000_000 {
        format!("{:.3}s", nanos as f64 / 1e9)
    } else if nanos >= 1_000_000 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos >= 1_000 {
        format!("{}µs", nanos / 1_000)
    } else {
        format!("{nanos}ns")
    }
}

/// Formats a timestamp as a relative "ago" phrase, or `fallback` when absent.
pub fn human_time(when: Option<OffsetDateTime>, fallback: &str) -> String {
    let Some(when) = when else {
        return fallback.to_string();
    };
    let seconds = (OffsetDateTime::now_utc() - when).whole_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }
    let seconds = seconds as u64;
    if seconds < 60 {
        return "just now".to_string();
    }
    let (count, unit) = if seconds < 3600 {
        (seconds / 60, "minute")
    } else if seconds < 86_400 {
        (seconds / 3600, "hour")
    } else if seconds < 7 * 86_400 {
        (seconds / 86_400, "day")
    } else if seconds < 30 * 86_400 {
        (seconds / (7 * 86_400), "week")
    } else if seconds < 365 * 86_400 {
        (seconds / (30 * 86_400), "month")
    } else {
        (seconds / (365 * 86_400), "year")
    };
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    #[test]
    fn bytes_tiers() {
        assert_eq!(human_bytes(999), "999 B");
        assert_eq!(human_bytes(1_500), "1.5 KB");
        assert_eq!(human_bytes(7_200_000), "7.2 MB");
        assert_eq!(human_bytes(4_100_000_000), "4.1 GB");
        assert_eq!(human_bytes(2_000_000_000_000), "2.0 TB");
    }

    #[test]
    fn duration_tiers() {
        assert_eq!(human_duration(850), "850ns");
        assert_eq!(human_duration(12_000), "12µs");
        assert_eq!(human_duration(64_000_000), "64ms");
        assert_eq!(human_duration(2_500_000_000), "2.500s");
    }

    #[test]
    fn time_fallback() {
        assert_eq!(human_time(None, "Never"), "Never");
    }

    #[test]
    fn time_relative_tiers() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(human_time(Some(now), "Never"), "just now");
        assert_eq!(
            human_time(Some(now - Duration::minutes(5)), "Never"),
            "5 minutes ago"
        );
        assert_eq!(
            human_time(Some(now - Duration::hours(1)), "Never"),
            "1 hour ago"
        );
        assert_eq!(
            human_time(Some(now - Duration::days(3)), "Never"),
            "3 days ago"
        );
        assert_eq!(
            human_time(Some(now - Duration::days(400)), "Never"),
            "1 year ago"
        );
    }
}
