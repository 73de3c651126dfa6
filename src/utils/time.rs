use chrono::{DateTime, Duration, DurationRound, NaiveDate, TimeZone};

/// This is the standard way of converting a date to a key in hydrowatch files.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next hour.
pub fn next_hour_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    match date.clone().duration_trunc(Duration::hours(1)) {
        Ok(hour) => hour + Duration::hours(1),
        // Truncation only fails on out of range values, which local wall-clock time never is.
        Err(_) => date + Duration::hours(1),
    }
}

/// Converts a signed chrono delta into a sleepable duration. Negative deltas mean the moment has
/// already passed.
pub fn until(delta: Duration) -> std::time::Duration {
    delta.to_std().unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{date_key, next_hour_start, until};

    #[test]
    fn test_next_hour_start_mid_hour() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 14, 7, 31).unwrap();
        assert_eq!(
            next_hour_start(time),
            Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_hour_start_on_the_hour() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap();
        assert_eq!(
            next_hour_start(time),
            Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_hour_start_crosses_midnight() {
        let time = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            next_hour_start(time),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_date_key_is_iso() {
        assert_eq!(
            date_key(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
            "2024-03-09"
        );
    }

    #[test]
    fn test_until_negative_is_zero() {
        assert_eq!(until(Duration::seconds(-5)), std::time::Duration::ZERO);
        assert_eq!(
            until(Duration::seconds(5)),
            std::time::Duration::from_secs(5)
        );
    }
}
