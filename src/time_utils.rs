// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
///
/// Fixed width, so stored timestamps sort lexically in chronological order.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the stored timestamp format.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_with_millis_and_z_suffix() {
        let date = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2025-03-01T12:30:05.000Z");
    }

    #[test]
    fn lexical_order_matches_chronological_order() {
        let earlier = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(format_utc_rfc3339(earlier) < format_utc_rfc3339(later));
    }
}
