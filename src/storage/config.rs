use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::fs::operations::write_atomically;

use super::StoreError;

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_DAILY_LIMIT_ML: u32 = 3000;
pub const DEFAULT_DRINK_INCREMENT_ML: u32 = 300;
pub const DEFAULT_REMINDER_INTERVAL_MINUTES: u32 = 30;

/// User settings. Every value is strictly positive once it leaves [ConfigStore].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub daily_limit_ml: u32,
    pub drink_increment_ml: u32,
    /// Loaded and kept complete in the file, but reminders follow the top of the hour.
    pub reminder_interval_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daily_limit_ml: DEFAULT_DAILY_LIMIT_ML,
            drink_increment_ml: DEFAULT_DRINK_INCREMENT_ML,
            reminder_interval_minutes: DEFAULT_REMINDER_INTERVAL_MINUTES,
        }
    }
}

/// Shape of the file on disk. Keys the application doesn't know are carried over untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    daily_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drink_amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reminder_interval: Option<u32>,
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

impl ConfigFile {
    /// Fills missing or zero values with defaults. Returns whether anything had to be filled.
    fn backfill(&mut self) -> bool {
        let defaults = Config::default();
        let mut changed = false;
        for (key, slot, default) in [
            ("daily_limit", &mut self.daily_limit, defaults.daily_limit_ml),
            ("drink_amount", &mut self.drink_amount, defaults.drink_increment_ml),
            (
                "reminder_interval",
                &mut self.reminder_interval,
                defaults.reminder_interval_minutes,
            ),
        ] {
            match *slot {
                Some(0) => {
                    warn!("Config value {key} must be positive, using default {default}");
                    *slot = Some(default);
                    changed = true;
                }
                Some(_) => {}
                None => {
                    debug!("Config value {key} is missing, using default {default}");
                    *slot = Some(default);
                    changed = true;
                }
            }
        }
        changed
    }

    fn to_config(&self) -> Config {
        let defaults = Config::default();
        Config {
            daily_limit_ml: self.daily_limit.unwrap_or(defaults.daily_limit_ml),
            drink_increment_ml: self.drink_amount.unwrap_or(defaults.drink_increment_ml),
            reminder_interval_minutes: self
                .reminder_interval
                .unwrap_or(defaults.reminder_interval_minutes),
        }
    }
}

/// How the configuration was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOutcome {
    /// The file didn't exist and was created with defaults.
    Created,
    /// The file was complete.
    Loaded,
    /// Some values were missing or invalid and the file was rewritten.
    Backfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigLoad {
    pub config: Config,
    pub outcome: ConfigOutcome,
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration, creating or completing the file on disk when needed.
    pub fn try_load(&self) -> Result<ConfigLoad, StoreError> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {:?}, creating defaults", self.path);
                let mut file = ConfigFile::default();
                file.backfill();
                self.write(&file)?;
                return Ok(ConfigLoad {
                    config: file.to_config(),
                    outcome: ConfigOutcome::Created,
                });
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let mut file: ConfigFile =
            serde_json::from_slice(&content).map_err(|e| StoreError::parse(&self.path, e))?;

        let outcome = if file.backfill() {
            self.write(&file)?;
            ConfigOutcome::Backfilled
        } else {
            ConfigOutcome::Loaded
        };

        Ok(ConfigLoad {
            config: file.to_config(),
            outcome,
        })
    }

    /// Never fails. Anything going wrong is logged and defaults are used instead, so the
    /// application can always start.
    pub fn load(&self) -> Config {
        match self.try_load() {
            Ok(ConfigLoad { config, .. }) => config,
            Err(e) => {
                error!("Failed to load config, falling back to defaults: {e}");
                Config::default()
            }
        }
    }

    fn write(&self, file: &ConfigFile) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec_pretty(file).map_err(|e| StoreError::serialize(&self.path, e))?;
        write_atomically(&self.path, &payload).map_err(|e| StoreError::io(&self.path, e))
    }
}
