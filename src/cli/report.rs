use chrono::{DateTime, Days, Local, NaiveDate};

use crate::{
    intake::tracker::IntakeStatus,
    reminder::console::format_status,
    storage::history::HistoryLog,
    utils::{percentage::Percentage, time::date_key},
};

pub fn print_status(status: &IntakeStatus, next_reminder: DateTime<Local>, interval_minutes: u32) {
    println!("{}", format_status(status, Some(next_reminder)));
    println!(
        "Reminders fire at the top of every hour (configured interval {interval_minutes} minutes)"
    );
}

/// One `date<TAB>amount<TAB>percentage` line per recorded day, oldest first. `days` keeps only the
/// last N calendar days ending with `today`.
pub fn format_history(
    log: &HistoryLog,
    today: NaiveDate,
    days: Option<u32>,
    daily_limit: u32,
) -> Vec<String> {
    let first_day = days
        .and_then(|days| today.checked_sub_days(Days::new(u64::from(days.saturating_sub(1)))))
        .unwrap_or(NaiveDate::MIN);

    log.range(first_day..)
        .map(|(date, amount)| {
            format!(
                "{}\t{amount}ml\t{}",
                date_key(*date),
                Percentage::of(*amount, daily_limit)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::storage::history::HistoryLog;

    use super::format_history;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn log() -> HistoryLog {
        HistoryLog::from([(day(3), 3000), (day(1), 600), (day(4), 900)])
    }

    #[test]
    fn test_history_is_sorted_by_date() {
        assert_eq!(
            format_history(&log(), day(4), None, 3000),
            vec![
                "2024-07-01\t600ml\t20%",
                "2024-07-03\t3000ml\t100%",
                "2024-07-04\t900ml\t30%",
            ]
        );
    }

    #[test]
    fn test_history_last_days() {
        assert_eq!(
            format_history(&log(), day(4), Some(2), 3000),
            vec!["2024-07-03\t3000ml\t100%", "2024-07-04\t900ml\t30%"]
        );
        assert_eq!(
            format_history(&log(), day(4), Some(1), 3000),
            vec!["2024-07-04\t900ml\t30%"]
        );
        assert!(format_history(&log(), day(10), Some(3), 3000).is_empty());
    }

    #[test]
    fn test_empty_history() {
        assert!(format_history(&HistoryLog::new(), day(4), None, 3000).is_empty());
    }
}
