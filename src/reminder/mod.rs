use std::path::PathBuf;

use anyhow::Result;
use tokio::{io::BufReader, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    intake::tracker::IntakeTracker,
    storage::{
        config::{Config, ConfigStore},
        history::{HistoryStorage, HistoryStore},
    },
    system::autostart::Autostart,
    utils::clock::{Clock, DefaultClock},
};

use self::{
    console::{read_console_input, ConsolePresenter},
    event_loop::ReminderLoop,
    presenter::{Presenter, UserInput},
};

pub mod console;
pub mod event_loop;
pub mod presenter;
pub mod scheduler;
pub mod shutdown;

/// Represents the starting point for an interactive reminder that keeps its files in `dir`.
pub async fn start_reminder(dir: PathBuf, autostart: impl Autostart) -> Result<()> {
    let config = ConfigStore::in_dir(&dir).load();
    info!("Starting reminder with {config:?}");

    let (sender, receiver) = mpsc::channel::<UserInput>(16);
    let shutdown_token = CancellationToken::new();

    let reminder = create_reminder_loop(
        HistoryStore::in_dir(&dir),
        &config,
        ConsolePresenter::new(),
        autostart,
        receiver,
        &shutdown_token,
        DefaultClock,
    );

    let (_, input_result, reminder_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        read_console_input(
            BufReader::new(tokio::io::stdin()),
            sender,
            shutdown_token.clone()
        ),
        reminder.run(),
    );

    if let Err(input_result) = input_result {
        error!("Console input got an error {:?}", input_result);
    }

    reminder_result
}

fn create_reminder_loop<H: HistoryStorage, P: Presenter, A: Autostart>(
    storage: H,
    config: &Config,
    presenter: P,
    autostart: A,
    receiver: mpsc::Receiver<UserInput>,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> ReminderLoop<H, P, A> {
    let tracker = IntakeTracker::new(config, storage, clock.now().date_naive());
    ReminderLoop::new(
        tracker,
        presenter,
        autostart,
        receiver,
        shutdown_token.clone(),
        Box::new(clock),
    )
}
