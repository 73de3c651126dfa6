use anyhow::{anyhow, Result};
use tracing::{debug, instrument};
use windows::Win32::{
    Foundation::{BOOL, HWND, LPARAM},
    UI::WindowsAndMessaging::{
        EnumWindows, GetWindowThreadProcessId, IsWindowVisible, SetForegroundWindow, ShowWindow,
        SW_RESTORE,
    },
};

struct WindowSearch {
    pid: u32,
    found: Option<HWND>,
}

unsafe extern "system" fn visit_window(window: HWND, param: LPARAM) -> BOOL {
    let search = &mut *(param.0 as *mut WindowSearch);
    let mut pid = 0u32;
    GetWindowThreadProcessId(window, Some(&mut pid));
    if pid == search.pid && IsWindowVisible(window).as_bool() {
        search.found = Some(window);
        // Stops the enumeration.
        return BOOL::from(false);
    }
    BOOL::from(true)
}

/// Raises the first visible top level window owned by `pid`.
///
/// A console program owns no window, its console belongs to conhost or Windows Terminal. For
/// the console front end this therefore reports "no visible window", which callers only log.
#[instrument]
pub fn focus_window_of(pid: u32) -> Result<()> {
    let mut search = WindowSearch { pid, found: None };
    // Returns an error when the callback stops early, the search result is what matters.
    let _ = unsafe {
        EnumWindows(
            Some(visit_window),
            LPARAM(&mut search as *mut WindowSearch as isize),
        )
    };

    let window = search
        .found
        .ok_or_else(|| anyhow!("Process {pid} has no visible window"))?;
    let _ = unsafe { ShowWindow(window, SW_RESTORE) };
    if !unsafe { SetForegroundWindow(window) }.as_bool() {
        return Err(anyhow!("Windows refused to focus the window of {pid}"));
    }
    debug!("Focused window of {pid}");
    Ok(())
}
