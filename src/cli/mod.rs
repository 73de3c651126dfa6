pub mod report;

use std::{
    ffi::OsString,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, level_filters::LevelFilter};

use crate::{
    intake::tracker::IntakeTracker,
    reminder::start_reminder,
    storage::{
        config::ConfigStore,
        history::{HistoryStorage, HistoryStore},
    },
    system::{
        autostart::{Autostart, GenericAutostart, LaunchCommand},
        singleton::{focus_instance, SingletonGuard},
    },
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX, REMINDER_PREFIX},
        runtime::block_on_current_thread,
        time::next_hour_start,
    },
};

use report::{format_history, print_status};

#[derive(Parser, Debug)]
#[command(name = "Hydrowatch", version, long_about = None)]
#[command(about = "Reminds you to drink water and keeps a daily log of it", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level, for example debug or trace. Falls back to RUST_LOG")]
    log_filter: Option<LevelFilter>,
    #[arg(long, global = true, help = "Echo logs to stderr")]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start the reminder in the current console")]
    Run,
    #[command(about = "Show today's progress")]
    Status,
    #[command(about = "Show the drinking history")]
    History {
        #[arg(
            long,
            value_parser = clap::value_parser!(u32).range(1..),
            help = "Only show the last N days, today included"
        )]
        days: Option<u32>,
    },
    #[command(about = "Log one drink of the configured amount")]
    Drink,
    #[command(about = "Clear today's record")]
    Clear {
        #[arg(long, short, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Manage starting the reminder at login")]
    Autostart {
        #[arg(value_enum)]
        action: AutostartAction,
    },
    #[command(about = "Stop running reminders")]
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AutostartAction {
    Enable,
    Disable,
    Status,
}

pub fn run_cli() -> Result<()> {
    let args = Args::parse();

    // A second reminder leaves without creating any file, logs included.
    if matches!(args.command, Commands::Run) {
        if let Some(pid) = reminder_guard()?.find_other_instance() {
            focus_instance(pid);
            println!("Hydrowatch is already running (pid {pid})");
            return Ok(());
        }
    }

    let app_dir = resolve_application_path(args.dir.clone())?;
    let prefix = match args.command {
        Commands::Run => REMINDER_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir, args.log_filter, args.log_console)?;
    info!("Running {:?} in {app_dir:?}", args.command);

    run_command(args, app_dir).inspect_err(|e| error!("Command failed {e:?}"))
}

fn run_command(args: Args, app_dir: PathBuf) -> Result<()> {
    match args.command {
        Commands::Run => {
            let autostart = GenericAutostart::new(launch_command(args.dir.as_deref())?)?;
            block_on_current_thread(start_reminder(app_dir, autostart))?
        }
        Commands::Status => {
            let tracker = open_tracker(&app_dir);
            let config = ConfigStore::in_dir(&app_dir).load();
            print_status(
                &tracker.status(),
                next_hour_start(Local::now()),
                config.reminder_interval_minutes,
            );
            Ok(())
        }
        Commands::History { days } => {
            let log = HistoryStore::in_dir(&app_dir).load()?;
            let config = ConfigStore::in_dir(&app_dir).load();
            let lines = format_history(&log, Local::now().date_naive(), days, config.daily_limit_ml);
            if lines.is_empty() {
                println!("Nothing recorded yet");
            }
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Drink => {
            refuse_while_running()?;
            let mut tracker = open_tracker(&app_dir);
            let amount = tracker.record_drink(Local::now().date_naive())?;
            println!("Recorded, {amount}ml today");
            Ok(())
        }
        Commands::Clear { yes } => {
            refuse_while_running()?;
            if !yes && !confirm("Clear today's record? [y/N]")? {
                println!("Nothing changed");
                return Ok(());
            }
            let mut tracker = open_tracker(&app_dir);
            tracker.clear_today(Local::now().date_naive())?;
            println!("Today's record was cleared");
            Ok(())
        }
        Commands::Autostart { action } => {
            let autostart = GenericAutostart::new(launch_command(args.dir.as_deref())?)?;
            match action {
                AutostartAction::Enable => autostart.set_enabled(true)?,
                AutostartAction::Disable => autostart.set_enabled(false)?,
                AutostartAction::Status => {}
            }
            let state = if autostart.is_enabled()? {
                "enabled"
            } else {
                "disabled"
            };
            println!("Autostart is {state}");
            Ok(())
        }
        Commands::Stop => {
            let stopped = reminder_guard()?.terminate_others();
            match stopped {
                0 => println!("Hydrowatch isn't running"),
                1 => println!("Stopped the running reminder"),
                n => println!("Stopped {n} running reminders"),
            }
            Ok(())
        }
    }
}

fn open_tracker(app_dir: &Path) -> IntakeTracker<HistoryStore> {
    let config = ConfigStore::in_dir(app_dir).load();
    IntakeTracker::new(
        &config,
        HistoryStore::in_dir(app_dir),
        Local::now().date_naive(),
    )
}

/// The running reminder keeps today's amount in memory and would overwrite a change made here.
fn refuse_while_running() -> Result<()> {
    if let Some(pid) = reminder_guard()?.find_other_instance() {
        bail!("Hydrowatch is running (pid {pid}), use its console instead");
    }
    Ok(())
}

/// Finds running reminders. One-shot commands share the executable and are left out.
fn reminder_guard() -> Result<SingletonGuard> {
    Ok(SingletonGuard::for_current_process()?.with_command_filter(is_run_command))
}

fn is_run_command(cmd: &[OsString]) -> bool {
    Args::try_parse_from(cmd).is_ok_and(|args| matches!(args.command, Commands::Run))
}

/// Login starts `run` with the same application directory as this invocation.
fn launch_command(dir: Option<&Path>) -> Result<LaunchCommand> {
    let mut args: Vec<OsString> = vec![];
    if let Some(dir) = dir {
        args.push("--dir".into());
        args.push(std::path::absolute(dir)?.into_os_string());
    }
    args.push("run".into());
    LaunchCommand::current_exe(args)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
