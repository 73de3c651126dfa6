use std::{
    ffi::OsString,
    path::Path,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Pid, Process, ProcessStatus, Signal, System};
use tracing::{debug, info, warn};

use crate::window_api::focus_process_window;

/// Tells whether a command line (program name included) belongs to the guarded kind of process.
pub type CommandFilter = fn(&[OsString]) -> bool;

/// Detects other running copies of the application by image name, optionally narrowed down by
/// their command line. The check is advisory: two processes starting at the same moment may both
/// see an empty table.
pub struct SingletonGuard {
    name: OsString,
    command_filter: Option<CommandFilter>,
}

impl SingletonGuard {
    pub fn new(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            command_filter: None,
        }
    }

    /// Only counts processes whose command line passes `filter`. Processes with an unreadable
    /// command line don't.
    pub fn with_command_filter(mut self, filter: CommandFilter) -> Self {
        self.command_filter = Some(filter);
        self
    }

    /// Guard for the image name of the running executable, `hydrowatch` or `hydrowatch.exe`.
    pub fn for_current_process() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let name = exe
            .file_name()
            .ok_or_else(|| anyhow!("Executable {exe:?} has no file name"))?;
        Ok(Self::new(name))
    }

    fn matches(&self, process: &Process) -> bool {
        // Linux reports threads as separate entries sharing the name.
        if process.thread_kind().is_some() || process.status() == ProcessStatus::Zombie {
            return false;
        }
        let same_image = process.name() == self.name.as_os_str()
            || process
                .exe()
                .and_then(Path::file_name)
                .is_some_and(|file_name| file_name == self.name);
        same_image && self.command_filter.is_none_or(|filter| filter(process.cmd()))
    }

    fn others<'a>(&self, system: &'a System) -> Vec<(Pid, &'a Process)> {
        let current = get_current_pid()
            .inspect_err(|e| warn!("Failed to get own pid {e}"))
            .ok();
        let mut others = system
            .processes()
            .iter()
            .filter(|(pid, _)| Some(**pid) != current)
            .filter(|(_, process)| self.matches(process))
            .map(|(pid, process)| (*pid, process))
            .collect::<Vec<_>>();
        others.sort_by_key(|(pid, _)| *pid);
        others
    }

    /// Every other process running under the guarded name.
    pub fn other_instances(&self) -> Vec<Pid> {
        let system = System::new_all();
        self.others(&system)
            .into_iter()
            .map(|(pid, _)| pid)
            .collect()
    }

    pub fn find_other_instance(&self) -> Option<Pid> {
        self.other_instances().into_iter().next()
    }

    pub fn is_already_running(&self) -> bool {
        let running = self.find_other_instance();
        debug!("Other instance of {:?}: {running:?}", self.name);
        running.is_some()
    }

    /// Asks every other instance to stop and waits for them to exit. Returns how many were found.
    pub fn terminate_others(&self) -> usize {
        let system = System::new_all();
        let mut count = 0;
        for (pid, process) in self.others(&system) {
            info!("Stopping instance {pid}");
            terminate(process);
            count += 1;
        }
        count
    }
}

/// Best effort: brings the window of a running instance to the front. Failures are only logged,
/// which is always the case for a reminder living in a console.
pub fn focus_instance(pid: Pid) {
    if let Err(e) = focus_process_window(pid) {
        debug!("Couldn't focus instance {pid}: {e}");
    }
}

fn terminate(process: &Process) {
    // Windows has no soft signal, kill is forceful there.
    if process.kill_with(Signal::Term).is_none() {
        process.kill();
    }
    process.wait();
}
