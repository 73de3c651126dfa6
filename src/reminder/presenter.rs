use chrono::{DateTime, Local};

use crate::intake::tracker::IntakeStatus;

/// Everything the user can ask of a running reminder. Inputs arrive asynchronously over a
/// channel, the answer to a due reminder is just another input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    /// Answers a due reminder with a drink, or logs a quick drink otherwise.
    Drink,
    Snooze,
    Dismiss,
    /// Already confirmed by the user.
    ClearToday,
    ToggleAutostart,
    Status,
    /// Already confirmed by the user.
    Quit,
}

/// Intended to serve as a contract between the reminder core and whatever shows it to the user.
/// Calls never block; answers come back as [UserInput].
pub trait Presenter {
    fn show_status(&mut self, status: &IntakeStatus, next_reminder: Option<DateTime<Local>>);

    /// A reminder fired and waits for [UserInput::Drink], [UserInput::Snooze] or
    /// [UserInput::Dismiss].
    fn reminder_due(&mut self, status: &IntakeStatus);

    fn info(&mut self, message: &str);

    fn error(&mut self, message: &str);
}
