//! Terminal front end of a running reminder. Output goes to stdout, commands are read line by
//! line from stdin and forwarded to the event loop as [UserInput].

use std::io::Write;

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, Local};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, Lines},
    select,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::intake::tracker::IntakeStatus;

use super::{
    presenter::{Presenter, UserInput},
    scheduler::SNOOZE,
};

pub struct ConsolePresenter {
    user_name: String,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        let user_name = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "Hey".into());
        Self { user_name }
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for ConsolePresenter {
    fn show_status(&mut self, status: &IntakeStatus, next_reminder: Option<DateTime<Local>>) {
        println!("{}", format_status(status, next_reminder));
    }

    fn reminder_due(&mut self, status: &IntakeStatus) {
        // Terminal bell, the closest thing to a popup a console has.
        print!("\x07");
        println!("{}", format_reminder(&self.user_name, status));
        let _ = std::io::stdout().flush();
    }

    fn info(&mut self, message: &str) {
        println!("{}", Colour::Green.paint(message));
    }

    fn error(&mut self, message: &str) {
        eprintln!("{}", Colour::Red.bold().paint(message));
    }
}

pub fn format_status(status: &IntakeStatus, next_reminder: Option<DateTime<Local>>) -> String {
    let mut line = format!(
        "Today: {} / {}ml ({})",
        Colour::Cyan.bold().paint(format!("{}ml", status.amount_ml)),
        status.daily_limit_ml,
        status.progress,
    );
    match next_reminder {
        Some(next) => line.push_str(&format!("  next reminder at {}", next.format("%H:%M"))),
        None => line.push_str("  reminder is waiting for an answer"),
    }
    if status.unsaved {
        line.push_str(&format!("  {}", Colour::Yellow.paint("(not saved yet)")));
    }
    line
}

pub fn format_reminder(user_name: &str, status: &IntakeStatus) -> String {
    format!(
        "{}\nToday: {}ml / {}ml\n[d] I drank {}ml   [s] remind me in {} minutes   [i] ignore",
        Style::new()
            .bold()
            .paint(format!("{user_name}, time to drink some water!")),
        status.amount_ml,
        status.daily_limit_ml,
        status.drink_increment_ml,
        SNOOZE.num_minutes(),
    )
}

const HELP: &str = "\
Commands:
  d, drink      log a drink, or answer a reminder with a drink
  s, snooze     remind me again in 10 minutes
  i, ignore     skip the current reminder
  c, clear      clear today's record
  a, autostart  toggle starting at login
  st, status    show today's progress
  q, quit       exit
  h, help       show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Send(UserInput),
    /// Forwarded only after the user agrees to the question.
    Confirm(UserInput, &'static str),
    Help,
}

fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let command = match line.trim().to_lowercase().as_str() {
        "d" | "drink" => ConsoleCommand::Send(UserInput::Drink),
        "s" | "snooze" => ConsoleCommand::Send(UserInput::Snooze),
        "i" | "ignore" | "dismiss" => ConsoleCommand::Send(UserInput::Dismiss),
        "st" | "status" => ConsoleCommand::Send(UserInput::Status),
        "a" | "autostart" => ConsoleCommand::Send(UserInput::ToggleAutostart),
        "c" | "clear" => ConsoleCommand::Confirm(
            UserInput::ClearToday,
            "Clear today's record? [y/N]",
        ),
        "q" | "quit" | "exit" => ConsoleCommand::Confirm(UserInput::Quit, "Quit hydrowatch? [y/N]"),
        "h" | "help" | "?" => ConsoleCommand::Help,
        _ => return None,
    };
    Some(command)
}

fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Reads console commands from `reader` and forwards them to `sender` until the input ends, the
/// receiving side goes away or `shutdown` is cancelled.
pub async fn read_console_input(
    reader: impl AsyncBufRead + Unpin,
    sender: mpsc::Sender<UserInput>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = reader.lines();

    while let Some(line) = next_line(&mut lines, &shutdown).await? {
        let input = match parse_command(&line) {
            Some(ConsoleCommand::Send(input)) => input,
            Some(ConsoleCommand::Confirm(input, question)) => {
                println!("{question}");
                match next_line(&mut lines, &shutdown).await? {
                    Some(answer) if is_yes(&answer) => input,
                    Some(_) => continue,
                    None => break,
                }
            }
            Some(ConsoleCommand::Help) => {
                println!("{HELP}");
                continue;
            }
            None => {
                if !line.trim().is_empty() {
                    println!("Unknown command {:?}, type 'help' for the list", line.trim());
                }
                continue;
            }
        };

        debug!("Console input {input:?}");
        if sender.send(input).await.is_err() {
            debug!("Reminder loop is gone, stop reading input");
            break;
        }
    }

    info!("Stopped reading console input");
    Ok(())
}

async fn next_line<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    shutdown: &CancellationToken,
) -> std::io::Result<Option<String>> {
    select! {
        _ = shutdown.cancelled() => Ok(None),
        line = lines.next_line() => line,
    }
}
