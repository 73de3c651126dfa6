use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::{
    storage::{
        config::Config,
        history::{HistoryLog, HistoryStorage},
        StoreError,
    },
    utils::percentage::Percentage,
};

/// Snapshot of the tracker handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeStatus {
    pub date: NaiveDate,
    pub amount_ml: u32,
    pub daily_limit_ml: u32,
    pub drink_increment_ml: u32,
    pub progress: Percentage,
    /// Set when the latest change couldn't be written to disk yet.
    pub unsaved: bool,
}

/// Daily intake state machine. Keeps the amount drunk on `current_date` and mirrors it into the
/// history log after every change.
///
/// The day boundary is detected lazily: every operation receives the current local date and rolls
/// the state over when it differs from the stored one.
pub struct IntakeTracker<H: HistoryStorage> {
    storage: H,
    current_date: NaiveDate,
    today_amount: u32,
    daily_limit: u32,
    drink_increment: u32,
    /// A save failed and has to be repeated.
    dirty: bool,
}

impl<H: HistoryStorage> IntakeTracker<H> {
    pub fn new(config: &Config, storage: H, today: NaiveDate) -> Self {
        let stored = match storage.load() {
            Ok(log) => log.get(&today).copied().unwrap_or(0),
            Err(e) => {
                error!("Failed to read history, starting from zero: {e}");
                0
            }
        };

        let today_amount = if stored > config.daily_limit_ml {
            warn!(
                "Stored amount {stored}ml exceeds the daily limit {}ml, clamping",
                config.daily_limit_ml
            );
            config.daily_limit_ml
        } else {
            stored
        };

        Self {
            storage,
            current_date: today,
            today_amount,
            daily_limit: config.daily_limit_ml,
            drink_increment: config.drink_increment_ml,
            dirty: false,
        }
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn today_amount(&self) -> u32 {
        self.today_amount
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Adds a drink, never going above the daily limit. Returns the new amount.
    ///
    /// The amount is updated even when saving fails. In that case the error is returned, the
    /// tracker stays dirty and the save is retried by the next operation.
    #[tracing::instrument(skip(self))]
    pub fn record_drink(&mut self, today: NaiveDate) -> Result<u32, StoreError> {
        self.observe_date(today);
        self.today_amount = self
            .today_amount
            .saturating_add(self.drink_increment)
            .min(self.daily_limit);
        info!(
            "Recorded {}ml, {}ml of {}ml today",
            self.drink_increment, self.today_amount, self.daily_limit
        );
        self.persist()?;
        Ok(self.today_amount)
    }

    /// Resets today's amount. Confirmation is up to the caller.
    #[tracing::instrument(skip(self))]
    pub fn clear_today(&mut self, today: NaiveDate) -> Result<u32, StoreError> {
        self.observe_date(today);
        self.today_amount = 0;
        info!("Cleared intake for {}", self.current_date);
        self.persist()?;
        Ok(self.today_amount)
    }

    /// Repeats a failed save. Does nothing when everything is on disk.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }

    pub fn progress_percent(&self) -> Percentage {
        Percentage::of(self.today_amount, self.daily_limit)
    }

    pub fn status(&self) -> IntakeStatus {
        IntakeStatus {
            date: self.current_date,
            amount_ml: self.today_amount,
            daily_limit_ml: self.daily_limit,
            drink_increment_ml: self.drink_increment,
            progress: self.progress_percent(),
            unsaved: self.dirty,
        }
    }

    /// Rolls over to `today` when the day changed since the last event.
    pub fn observe_date(&mut self, today: NaiveDate) {
        if today != self.current_date {
            info!("Day changed from {} to {today}", self.current_date);
            if self.dirty {
                // The previous day still has to land on disk before its amount is forgotten.
                if let Err(e) = self.persist() {
                    error!("Dropping unsaved amount for {}: {e}", self.current_date);
                }
            }
            self.current_date = today;
            self.today_amount = 0;
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let result = self.stored_log().and_then(|mut log| {
            log.insert(self.current_date, self.today_amount);
            self.storage.save(&log)
        });
        match result {
            Ok(()) => {
                debug!("Persisted {}ml for {}", self.today_amount, self.current_date);
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                error!("Failed to persist intake, will retry on the next event: {e}");
                self.dirty = true;
                Err(e)
            }
        }
    }

    /// The log to update. An unreadable log is set aside and replaced by an empty one, otherwise
    /// no save could ever succeed again.
    fn stored_log(&self) -> Result<HistoryLog, StoreError> {
        match self.storage.load() {
            Err(e @ StoreError::Parse { .. }) => {
                error!("History is unreadable, starting a new one: {e}");
                self.storage.set_aside()?;
                Ok(HistoryLog::new())
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        io::{self, ErrorKind},
        rc::Rc,
    };

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        intake::tracker::IntakeTracker,
        storage::{
            config::Config,
            history::{HistoryLog, HistoryStorage, HistoryStore, MockHistoryStorage},
            StoreError,
        },
        utils::{logging::TEST_LOGGING, percentage::Percentage},
    };

    const TEST_DAY: NaiveDate = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
    const NEXT_DAY: NaiveDate = NaiveDate::from_ymd_opt(2024, 7, 5).unwrap();

    fn config(limit: u32, increment: u32) -> Config {
        Config {
            daily_limit_ml: limit,
            drink_increment_ml: increment,
            ..Config::default()
        }
    }

    fn storage_failure() -> StoreError {
        StoreError::io("history.json", io::Error::new(ErrorKind::Other, "disk full"))
    }

    /// In-memory storage that shares its log with the test.
    #[derive(Clone, Default)]
    struct MemoryStorage {
        log: Rc<RefCell<HistoryLog>>,
    }

    impl HistoryStorage for MemoryStorage {
        fn load(&self) -> Result<HistoryLog, StoreError> {
            Ok(self.log.borrow().clone())
        }

        fn save(&self, log: &HistoryLog) -> Result<(), StoreError> {
            *self.log.borrow_mut() = log.clone();
            Ok(())
        }

        fn set_aside(&self) -> Result<(), StoreError> {
            self.log.borrow_mut().clear();
            Ok(())
        }
    }

    fn tracker_with(amount: u32, config: &Config) -> (IntakeTracker<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::default();
        storage.log.borrow_mut().insert(TEST_DAY, amount);
        (IntakeTracker::new(config, storage.clone(), TEST_DAY), storage)
    }

    #[test]
    fn test_record_drink_adds_increment() -> Result<()> {
        *TEST_LOGGING;
        let (mut tracker, storage) = tracker_with(600, &config(3000, 300));

        assert_eq!(tracker.record_drink(TEST_DAY)?, 900);
        assert_eq!(storage.log.borrow().get(&TEST_DAY), Some(&900));
        Ok(())
    }

    #[test]
    fn test_record_drink_clamps_at_limit() -> Result<()> {
        let (mut tracker, storage) = tracker_with(2900, &config(3000, 300));

        assert_eq!(tracker.record_drink(TEST_DAY)?, 3000);
        assert_eq!(tracker.record_drink(TEST_DAY)?, 3000);
        assert_eq!(storage.log.borrow().get(&TEST_DAY), Some(&3000));
        assert_eq!(tracker.progress_percent(), Percentage::FULL);
        Ok(())
    }

    #[test]
    fn test_record_drink_matches_min_law() -> Result<()> {
        for (start, increment, limit) in [(0, 300, 3000), (2700, 300, 3000), (10, 7, 12), (0, 500, 250)]
        {
            let (mut tracker, _) = tracker_with(start, &config(limit, increment));
            let amount = tracker.record_drink(TEST_DAY)?;
            assert_eq!(amount, (start + increment).min(limit));
            assert!(amount <= limit);
            assert!(*tracker.progress_percent() <= 100);
        }
        Ok(())
    }

    #[test]
    fn test_day_rollover_resets_amount() -> Result<()> {
        let (mut tracker, storage) = tracker_with(2400, &config(3000, 300));

        assert_eq!(tracker.record_drink(NEXT_DAY)?, 300);
        assert_eq!(tracker.current_date(), NEXT_DAY);
        let log = storage.log.borrow();
        assert_eq!(log.get(&TEST_DAY), Some(&2400));
        assert_eq!(log.get(&NEXT_DAY), Some(&300));
        Ok(())
    }

    #[test]
    fn test_clear_today_keeps_other_days() -> Result<()> {
        let (mut tracker, storage) = tracker_with(1500, &config(3000, 300));
        storage
            .log
            .borrow_mut()
            .insert(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(), 2000);

        assert_eq!(tracker.clear_today(TEST_DAY)?, 0);
        assert_eq!(tracker.progress_percent(), Percentage::ZERO);
        let log = storage.log.borrow();
        assert_eq!(log.get(&TEST_DAY), Some(&0));
        assert_eq!(log.len(), 2);
        Ok(())
    }

    #[test]
    fn test_initial_amount_is_clamped() {
        let (tracker, _) = tracker_with(5000, &config(3000, 300));

        assert_eq!(tracker.today_amount(), 3000);
        assert_eq!(tracker.progress_percent(), Percentage::FULL);
    }

    #[test]
    fn test_zero_limit_has_no_progress() -> Result<()> {
        let (mut tracker, _) = tracker_with(0, &config(0, 300));

        assert_eq!(tracker.record_drink(TEST_DAY)?, 0);
        assert_eq!(tracker.progress_percent(), Percentage::ZERO);
        Ok(())
    }

    #[test]
    fn test_unreadable_history_starts_from_zero() {
        let mut storage = MockHistoryStorage::new();
        storage.expect_load().returning(|| Err(storage_failure()));

        let tracker = IntakeTracker::new(&config(3000, 300), storage, TEST_DAY);

        assert_eq!(tracker.today_amount(), 0);
    }

    #[test]
    fn test_failed_save_keeps_state_and_retries() -> Result<()> {
        let mut storage = MockHistoryStorage::new();
        storage.expect_load().returning(|| Ok(HistoryLog::new()));
        let mut attempts = 0;
        storage.expect_save().times(3).returning(move |_| {
            attempts += 1;
            if attempts == 1 {
                Err(storage_failure())
            } else {
                Ok(())
            }
        });

        let mut tracker = IntakeTracker::new(&config(3000, 300), storage, TEST_DAY);

        assert!(tracker.record_drink(TEST_DAY).is_err());
        assert_eq!(tracker.today_amount(), 300);
        assert!(tracker.has_unsaved_changes());
        assert!(tracker.status().unsaved);

        assert_eq!(tracker.record_drink(TEST_DAY)?, 600);
        assert!(!tracker.has_unsaved_changes());

        // Nothing is pending so flushing doesn't touch storage.
        tracker.flush()?;

        tracker.clear_today(TEST_DAY)?;
        Ok(())
    }

    #[test]
    fn test_flush_retries_pending_save() -> Result<()> {
        let mut storage = MockHistoryStorage::new();
        storage.expect_load().returning(|| Ok(HistoryLog::new()));
        let mut attempts = 0;
        storage
            .expect_save()
            .withf(|log| log.get(&TEST_DAY) == Some(&300))
            .times(2)
            .returning(move |_| {
                attempts += 1;
                if attempts == 1 {
                    Err(storage_failure())
                } else {
                    Ok(())
                }
            });

        let mut tracker = IntakeTracker::new(&config(3000, 300), storage, TEST_DAY);
        assert!(tracker.record_drink(TEST_DAY).is_err());

        tracker.flush()?;

        assert!(!tracker.has_unsaved_changes());
        Ok(())
    }

    #[test]
    fn test_tracker_with_file_storage() -> Result<()> {
        let dir = tempdir()?;
        let config = config(3000, 300);
        {
            let mut tracker = IntakeTracker::new(&config, HistoryStore::in_dir(dir.path()), TEST_DAY);
            tracker.record_drink(TEST_DAY)?;
            tracker.record_drink(TEST_DAY)?;
        }

        let tracker = IntakeTracker::new(&config, HistoryStore::in_dir(dir.path()), TEST_DAY);

        assert_eq!(tracker.today_amount(), 600);
        assert_eq!(*tracker.progress_percent(), 20);
        Ok(())
    }

    #[test]
    fn test_unreadable_history_is_replaced() -> Result<()> {
        let dir = tempdir()?;
        let store = HistoryStore::in_dir(dir.path());
        std::fs::write(store.path(), "{ truncated")?;
        let mut tracker = IntakeTracker::new(&config(3000, 300), HistoryStore::in_dir(dir.path()), TEST_DAY);

        assert_eq!(tracker.record_drink(TEST_DAY)?, 300);
        assert!(!tracker.has_unsaved_changes());
        assert_eq!(tracker.record_drink(TEST_DAY)?, 600);

        assert_eq!(store.load()?, HistoryLog::from([(TEST_DAY, 600)]));
        assert_eq!(std::fs::read_to_string(store.set_aside_path())?, "{ truncated");
        Ok(())
    }
}
