//! Countdown Formatting
//!
//! The same number of seconds is shown two ways: customers see a ticking
//! pickup clock, merchants see a coarse time-left label on each listing.

/// Pickup countdown as `H:MM:SS`, e.g. `0:59:59`.
pub fn format_pickup_countdown(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Listing countdown as `Hh Mm`, or `Mm` under an hour. Seconds are dropped.
pub fn format_listing_countdown(seconds: u64) -> String {
    let total_minutes = seconds / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_countdown_pads_minutes_and_seconds() {
        assert_eq!(format_pickup_countdown(3600), "1:00:00");
        assert_eq!(format_pickup_countdown(3599), "0:59:59");
        assert_eq!(format_pickup_countdown(65), "0:01:05");
        assert_eq!(format_pickup_countdown(0), "0:00:00");
    }

    #[test]
    fn pickup_countdown_leaves_hours_unpadded() {
        assert_eq!(format_pickup_countdown(36_000 + 61), "10:01:01");
    }

    #[test]
    fn listing_countdown_shows_hours_when_present() {
        assert_eq!(format_listing_countdown(82 * 60), "1h 22m");
        assert_eq!(format_listing_countdown(125 * 60 + 59), "2h 5m");
        assert_eq!(format_listing_countdown(3600), "1h 0m");
    }

    #[test]
    fn listing_countdown_drops_hours_under_an_hour() {
        assert_eq!(format_listing_countdown(45 * 60), "45m");
        assert_eq!(format_listing_countdown(59), "0m");
    }
}
