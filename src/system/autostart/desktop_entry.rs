use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use crate::{fs::operations::write_atomically, utils::dir::APPLICATION_NAME};

use super::{Autostart, LaunchCommand};

/// Autostart through `$XDG_CONFIG_HOME/autostart/hydrowatch.desktop`. Desktop environments start
/// every entry in that directory at login.
pub struct DesktopEntryAutostart {
    entry_path: PathBuf,
    command: LaunchCommand,
}

impl DesktopEntryAutostart {
    pub fn new(entry_path: PathBuf, command: LaunchCommand) -> Self {
        Self {
            entry_path,
            command,
        }
    }

    pub fn in_user_config(command: LaunchCommand) -> Result<Self> {
        let config_dir = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
            .map_err(|_| anyhow!("Couldn't find neither XDG_CONFIG_HOME nor HOME"))?;
        Ok(Self::new(
            config_dir
                .join("autostart")
                .join(format!("{APPLICATION_NAME}.desktop")),
            command,
        ))
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    fn exec_line(&self) -> String {
        let mut line = quote_exec_arg(&self.command.exe.to_string_lossy());
        for arg in &self.command.args {
            line.push(' ');
            line.push_str(&quote_exec_arg(&arg.to_string_lossy()));
        }
        line
    }

    fn entry(&self) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Hydrowatch\n\
             Comment=Reminds you to drink water every hour\n\
             Exec={}\n\
             Terminal=true\n\
             X-GNOME-Autostart-enabled=true\n",
            self.exec_line()
        )
    }
}

impl Autostart for DesktopEntryAutostart {
    fn is_enabled(&self) -> Result<bool> {
        let content = match std::fs::read_to_string(&self.entry_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", self.entry_path))
            }
        };

        let expected = self.exec_line();
        let mut exec_matches = false;
        for line in content.lines().map(str::trim) {
            if line == "Hidden=true" {
                debug!("Autostart entry is hidden");
                return Ok(false);
            }
            if let Some(exec) = line.strip_prefix("Exec=") {
                exec_matches = exec == expected;
            }
        }
        Ok(exec_matches)
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        if enabled {
            if let Some(parent) = self.entry_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {parent:?}"))?;
            }
            write_atomically(&self.entry_path, self.entry().as_bytes())
                .with_context(|| format!("Failed to write {:?}", self.entry_path))?;
            info!("Created autostart entry {:?}", self.entry_path);
        } else {
            match std::fs::remove_file(&self.entry_path) {
                Ok(()) => info!("Removed autostart entry {:?}", self.entry_path),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Autostart entry was already absent")
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to remove {:?}", self.entry_path))
                }
            }
        }
        Ok(())
    }
}

/// Quotes an `Exec` argument following the desktop entry rules. Plain arguments are left as is.
fn quote_exec_arg(arg: &str) -> String {
    const RESERVED: &[char] = &[
        ' ', '\t', '\n', '"', '\'', '\\', '>', '<', '~', '|', '&', ';', '$', '*', '?', '#', '(',
        ')', '`',
    ];
    if !arg.is_empty() && !arg.contains(RESERVED) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
