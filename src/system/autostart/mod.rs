//! Per-user "run at login" registration. [GenericAutostart] picks the mechanism of the platform:
//! the `Run` registry key on Windows, an XDG autostart desktop entry elsewhere.

#[cfg(not(feature = "win"))]
pub mod desktop_entry;
#[cfg(feature = "win")]
pub mod registry;

use std::{ffi::OsString, path::PathBuf};

use anyhow::Result;

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait Autostart {
    fn is_enabled(&self) -> Result<bool>;

    fn set_enabled(&self, enabled: bool) -> Result<()>;
}

/// Command line started at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub exe: PathBuf,
    pub args: Vec<OsString>,
}

impl LaunchCommand {
    /// Relaunches the current executable with `args`.
    pub fn current_exe(args: impl IntoIterator<Item = impl Into<OsString>>) -> Result<Self> {
        Ok(Self {
            exe: std::env::current_exe()?,
            args: args.into_iter().map(Into::into).collect(),
        })
    }
}

/// Serves as a cross-compatible Autostart implementation.
pub struct GenericAutostart {
    inner: Box<dyn Autostart>,
}

impl GenericAutostart {
    pub fn new(command: LaunchCommand) -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use registry::RegistryAutostart;
                Ok(Self {
                    inner: Box::new(RegistryAutostart::new(command)),
                })
            } else {
                use desktop_entry::DesktopEntryAutostart;
                Ok(Self {
                    inner: Box::new(DesktopEntryAutostart::in_user_config(command)?),
                })
            }
        }
    }
}

impl Autostart for GenericAutostart {
    fn is_enabled(&self) -> Result<bool> {
        self.inner.is_enabled()
    }

    fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.inner.set_enabled(enabled)
    }
}
