use std::future::pending;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};

use crate::{
    intake::tracker::IntakeTracker,
    storage::history::HistoryStorage,
    system::autostart::Autostart,
    utils::clock::Clock,
};

use super::{
    presenter::{Presenter, UserInput},
    scheduler::{ReminderChoice, ReminderScheduler},
};

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// The only event loop of a running reminder. Owns the timer, the intake state and every file
/// access, so nothing here needs locking.
pub struct ReminderLoop<H: HistoryStorage, P: Presenter, A: Autostart> {
    tracker: IntakeTracker<H>,
    scheduler: ReminderScheduler,
    presenter: P,
    autostart: A,
    inputs: mpsc::Receiver<UserInput>,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<H: HistoryStorage, P: Presenter, A: Autostart> ReminderLoop<H, P, A> {
    pub fn new(
        tracker: IntakeTracker<H>,
        presenter: P,
        autostart: A,
        inputs: mpsc::Receiver<UserInput>,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        let scheduler = ReminderScheduler::new(clock.now());
        Self {
            tracker,
            scheduler,
            presenter,
            autostart,
            inputs,
            shutdown,
            clock,
        }
    }

    /// Executes the reminder event loop until the user quits or the shutdown token is cancelled.
    pub async fn run(mut self) -> Result<()> {
        self.show_status();
        let mut inputs_open = true;

        loop {
            let wait = self.scheduler.time_until_fire(self.clock.now());
            let clock = &self.clock;
            let timer = async move {
                match wait {
                    Some(wait) => clock.sleep(wait).await,
                    // Due reminders wait for the user only.
                    None => pending::<()>().await,
                }
            };

            let flow = tokio::select! {
                _ = self.shutdown.cancelled() => Flow::Stop,
                input = self.inputs.recv(), if inputs_open => match input {
                    Some(input) => {
                        let _span = info_span!("Handling input", ?input).entered();
                        self.handle_input(input)
                    }
                    None => {
                        warn!("Input closed, reminders keep running until shutdown");
                        inputs_open = false;
                        Flow::Continue
                    }
                },
                _ = timer => {
                    self.on_timer();
                    Flow::Continue
                }
            };

            if flow == Flow::Stop {
                break;
            }
        }

        self.finish();
        Ok(())
    }

    fn on_timer(&mut self) {
        let now = self.clock.now();
        self.tracker.observe_date(now.date_naive());
        if let Err(e) = self.tracker.flush() {
            error!("Retrying save failed again {e:?}");
        }
        if self.scheduler.fire(now) {
            info!("Reminder is due");
            self.presenter.reminder_due(&self.tracker.status());
        }
    }

    fn handle_input(&mut self, input: UserInput) -> Flow {
        let now = self.clock.now();
        debug!("Handling {input:?} at {now}");
        match input {
            UserInput::Drink => {
                let result = self.tracker.record_drink(now.date_naive());
                if self.scheduler.is_due() {
                    self.scheduler.respond(ReminderChoice::Drink, now);
                }
                match result {
                    Ok(amount) => self.presenter.info(&format!(
                        "Recorded {}ml, {amount}ml today",
                        self.tracker.status().drink_increment_ml
                    )),
                    Err(e) => self.report_save_error(e),
                }
                self.show_status();
            }
            UserInput::Snooze | UserInput::Dismiss => {
                let choice = if input == UserInput::Snooze {
                    ReminderChoice::Snooze
                } else {
                    ReminderChoice::Dismiss
                };
                match self.scheduler.respond(choice, now) {
                    Some(_) => self.show_status(),
                    None => self.presenter.info("No reminder is due right now"),
                }
            }
            UserInput::ClearToday => {
                match self.tracker.clear_today(now.date_naive()) {
                    Ok(_) => self.presenter.info("Today's record was cleared"),
                    Err(e) => self.report_save_error(e),
                }
                self.show_status();
            }
            UserInput::ToggleAutostart => self.toggle_autostart(),
            UserInput::Status => {
                self.tracker.observe_date(now.date_naive());
                self.show_status();
            }
            UserInput::Quit => return Flow::Stop,
        }
        Flow::Continue
    }

    fn toggle_autostart(&mut self) {
        let result = self.autostart.is_enabled().and_then(|enabled| {
            self.autostart.set_enabled(!enabled)?;
            Ok(!enabled)
        });
        match result {
            Ok(true) => self.presenter.info("Autostart enabled"),
            Ok(false) => self.presenter.info("Autostart disabled"),
            Err(e) => {
                error!("Failed to change autostart {e:?}");
                self.presenter
                    .error(&format!("Couldn't change autostart setting: {e}"));
            }
        }
    }

    fn report_save_error(&mut self, e: impl std::fmt::Display) {
        self.presenter.error(&format!(
            "Couldn't save intake, it will be retried on the next event: {e}"
        ));
    }

    fn show_status(&mut self) {
        self.presenter
            .show_status(&self.tracker.status(), self.scheduler.next_fire_time());
    }

    fn finish(&mut self) {
        if let Err(e) = self.tracker.flush() {
            error!("Unsaved intake is lost on exit {e:?}");
            self.presenter
                .error(&format!("Couldn't save intake before exiting: {e}"));
        }
        self.shutdown.cancel();
        info!("Reminder stopped");
    }
}
