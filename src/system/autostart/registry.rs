use anyhow::{anyhow, Result};
use tracing::{error, info};
use windows::{
    core::HSTRING,
    Win32::{
        Foundation::{ERROR_FILE_NOT_FOUND, WIN32_ERROR},
        System::Registry::{
            RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
            HKEY_CURRENT_USER, KEY_READ, KEY_SET_VALUE, REG_SAM_FLAGS, REG_SZ,
        },
    },
};

use super::{Autostart, LaunchCommand};

const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
const VALUE_NAME: &str = "Hydrowatch";

/// Autostart through the per-user `Run` registry key.
pub struct RegistryAutostart {
    command: String,
}

impl RegistryAutostart {
    pub fn new(command: LaunchCommand) -> Self {
        let mut line = format!("\"{}\"", command.exe.display());
        for arg in command.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        Self { command: line }
    }
}

struct RunKey(HKEY);

impl RunKey {
    fn open(access: REG_SAM_FLAGS) -> Result<Self> {
        let mut key = HKEY::default();
        let path = HSTRING::from(RUN_KEY);
        unsafe { RegOpenKeyExW(HKEY_CURRENT_USER, &path, 0, access, &mut key) }
            .ok()
            .map_err(|e| anyhow!("Failed to open {RUN_KEY}: {e}"))?;
        Ok(Self(key))
    }
}

impl Drop for RunKey {
    fn drop(&mut self) {
        if let Err(e) = unsafe { RegCloseKey(self.0) }.ok() {
            error!("Failed to close registry key {e:?}");
        }
    }
}

fn check(result: WIN32_ERROR, action: &str) -> Result<()> {
    result
        .ok()
        .map_err(|e| anyhow!("Failed to {action} autostart value: {e}"))
}

impl Autostart for RegistryAutostart {
    fn is_enabled(&self) -> Result<bool> {
        let key = RunKey::open(KEY_READ)?;
        let name = HSTRING::from(VALUE_NAME);
        let mut buffer = [0u16; 1024];
        let mut size = (buffer.len() * size_of::<u16>()) as u32;
        let result = unsafe {
            RegQueryValueExW(
                key.0,
                &name,
                None,
                None,
                Some(buffer.as_mut_ptr().cast()),
                Some(&mut size as *mut u32),
            )
        };
        if result == ERROR_FILE_NOT_FOUND {
            return Ok(false);
        }
        check(result, "read")?;

        let len = (size as usize / size_of::<u16>()).min(buffer.len());
        let value = String::from_utf16_lossy(&buffer[..len]);
        Ok(value.trim_end_matches('\0') == self.command)
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        let key = RunKey::open(KEY_SET_VALUE)?;
        let name = HSTRING::from(VALUE_NAME);
        if enabled {
            let data = self
                .command
                .encode_utf16()
                .chain(std::iter::once(0))
                .flat_map(u16::to_le_bytes)
                .collect::<Vec<u8>>();
            check(
                unsafe { RegSetValueExW(key.0, &name, 0, REG_SZ, Some(&data)) },
                "write",
            )?;
            info!("Registered autostart {}", self.command);
        } else {
            let result = unsafe { RegDeleteValueW(key.0, &name) };
            if result != ERROR_FILE_NOT_FOUND {
                check(result, "remove")?;
            }
            info!("Removed autostart registration");
        }
        Ok(())
    }
}
