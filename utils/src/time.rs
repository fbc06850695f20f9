//! Time formatting helpers.

/// Format a duration in seconds to a short human-readable string.
pub fn format_duration(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 => format!("{}m {}s", secs / 60, secs % 60),
        3_600..=86_399 => format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60),
        _ => format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600),
    }
}

/// Time left until `deadline` as seen at `now`, or `"ended"` once it passed.
pub fn format_remaining(now: u64, deadline: u64) -> String {
    if now >= deadline {
        "ended".to_string()
    } else {
        format_duration(deadline - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7_260), "2h 1m");
        assert_eq!(format_duration(7 * 86_400 + 3_600), "7d 1h");
    }

    #[test]
    fn remaining() {
        assert_eq!(format_remaining(100, 160), "1m 0s");
        assert_eq!(format_remaining(160, 160), "ended");
    }
}
