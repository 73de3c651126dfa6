use chrono::{DateTime, Duration, Local};
use tracing::{debug, warn};

use crate::utils::time::{next_hour_start, until};

/// Snoozing always postpones by this much, regardless of configuration.
pub const SNOOZE: Duration = Duration::minutes(10);

/// Answer of the user to a due reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderChoice {
    /// The user drank. The caller records the drink, the reminder moves to the next hour.
    Drink,
    /// Remind again in [SNOOZE].
    Snooze,
    /// Skip this reminder, the next one comes at the top of the next hour.
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Waiting for the timer.
    Armed { next_fire: DateTime<Local> },
    /// Waiting for the user. There is no timeout.
    Due { since: DateTime<Local> },
}

/// Single-shot reminder countdown that is re-armed after every answer. It doesn't own a timer,
/// the event loop asks how long to sleep and reports back when it woke up.
#[derive(Debug, Clone)]
pub struct ReminderScheduler {
    state: ReminderState,
}

impl ReminderScheduler {
    /// Creates a scheduler armed for the top of the next hour.
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            state: ReminderState::Armed {
                next_fire: next_hour_start(now),
            },
        }
    }

    pub fn state(&self) -> ReminderState {
        self.state
    }

    pub fn is_due(&self) -> bool {
        matches!(self.state, ReminderState::Due { .. })
    }

    /// Moment the reminder fires, none when it already did and waits for an answer.
    pub fn next_fire_time(&self) -> Option<DateTime<Local>> {
        match self.state {
            ReminderState::Armed { next_fire } => Some(next_fire),
            ReminderState::Due { .. } => None,
        }
    }

    /// How long the event loop should sleep before calling [Self::fire].
    pub fn time_until_fire(&self, now: DateTime<Local>) -> Option<std::time::Duration> {
        self.next_fire_time().map(|next| until(next - now))
    }

    /// Moves an armed reminder whose time has come into the due state. Returns whether it did.
    pub fn fire(&mut self, now: DateTime<Local>) -> bool {
        match self.state {
            ReminderState::Armed { next_fire } if now >= next_fire => {
                debug!("Reminder scheduled for {next_fire} is due");
                self.state = ReminderState::Due { since: now };
                true
            }
            _ => false,
        }
    }

    /// Applies the answer to a due reminder and returns the new fire time. Answers while armed are
    /// rejected and leave the schedule untouched.
    pub fn respond(
        &mut self,
        choice: ReminderChoice,
        now: DateTime<Local>,
    ) -> Option<DateTime<Local>> {
        if !self.is_due() {
            warn!("Ignoring {choice:?}, no reminder is due");
            return None;
        }
        let next = match choice {
            ReminderChoice::Snooze => now + SNOOZE,
            ReminderChoice::Drink | ReminderChoice::Dismiss => next_hour_start(now),
        };
        debug!("Reminder answered with {choice:?}, next at {next}");
        self.state = ReminderState::Armed { next_fire: next };
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Local, TimeZone};

    use super::{ReminderChoice, ReminderScheduler, ReminderState};

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 7, 4, hour, minute, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_new_scheduler_waits_for_next_hour() {
        let scheduler = ReminderScheduler::new(at(13, 20));

        assert_eq!(scheduler.next_fire_time(), Some(at(14, 0)));
        assert_eq!(
            scheduler.time_until_fire(at(13, 20)),
            Some(std::time::Duration::from_secs(40 * 60))
        );
    }

    #[test]
    fn test_fire_only_when_time_has_come() {
        let mut scheduler = ReminderScheduler::new(at(13, 20));

        assert!(!scheduler.fire(at(13, 59)));
        assert!(!scheduler.is_due());

        assert!(scheduler.fire(at(14, 0)));
        assert_eq!(scheduler.state(), ReminderState::Due { since: at(14, 0) });
        assert_eq!(scheduler.time_until_fire(at(14, 1)), None);

        // Already due, firing again changes nothing.
        assert!(!scheduler.fire(at(14, 5)));
    }

    #[test]
    fn test_snooze_is_ten_minutes() {
        let mut scheduler = ReminderScheduler::new(at(13, 20));
        scheduler.fire(at(14, 0));

        assert_eq!(
            scheduler.respond(ReminderChoice::Snooze, at(14, 7)),
            Some(at(14, 17))
        );
        assert_eq!(scheduler.next_fire_time(), Some(at(14, 17)));
    }

    #[test]
    fn test_drink_and_dismiss_rearm_next_hour() {
        for choice in [ReminderChoice::Drink, ReminderChoice::Dismiss] {
            let mut scheduler = ReminderScheduler::new(at(13, 20));
            scheduler.fire(at(14, 0));

            assert_eq!(scheduler.respond(choice, at(14, 3)), Some(at(15, 0)));
            assert!(!scheduler.is_due());
        }
    }

    #[test]
    fn test_late_fire_after_sleep() {
        let mut scheduler = ReminderScheduler::new(at(13, 20));

        // The machine slept through the reminder.
        assert_eq!(
            scheduler.time_until_fire(at(16, 45)),
            Some(std::time::Duration::ZERO)
        );
        assert!(scheduler.fire(at(16, 45)));
        assert_eq!(
            scheduler.respond(ReminderChoice::Dismiss, at(16, 46)),
            Some(at(17, 0))
        );
    }

    #[test]
    fn test_respond_while_armed_is_rejected() {
        let mut scheduler = ReminderScheduler::new(at(13, 20));

        assert_eq!(scheduler.respond(ReminderChoice::Snooze, at(13, 25)), None);
        assert_eq!(scheduler.next_fire_time(), Some(at(14, 0)));
    }

    #[test]
    fn test_snooze_can_cross_the_hour() {
        let mut scheduler = ReminderScheduler::new(at(13, 20));
        scheduler.fire(at(14, 0));
        scheduler.respond(ReminderChoice::Snooze, at(14, 55));

        assert!(!scheduler.fire(at(15, 0)));
        assert!(scheduler.fire(at(15, 5)));
        assert_eq!(
            scheduler.state(),
            ReminderState::Due { since: at(15, 5) }
        );
    }
}
