//! Window manipulation of other processes. Only Windows (`win` feature) has an implementation,
//! elsewhere [focus_process_window] reports that it can't help.

#[cfg(feature = "win")]
pub mod win;

use anyhow::Result;
use sysinfo::Pid;

/// Restores and raises the top level window owned by `pid`. Processes without a window of their
/// own, console programs included, get an error.
pub fn focus_process_window(pid: Pid) -> Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "win")] {
            win::focus_window_of(pid.as_u32())
        } else {
            Err(anyhow::anyhow!(
                "Focusing the window of {pid} isn't supported on this platform"
            ))
        }
    }
}
