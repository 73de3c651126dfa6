use std::{
    collections::BTreeMap,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::fs::operations::write_atomically;

use super::StoreError;

pub const HISTORY_FILE_NAME: &str = "drinking_history.json";
const SET_ASIDE_SUFFIX: &str = "corrupt";

/// Milliliters drunk per calendar day. Serialized as `{"YYYY-MM-DD": ml}`.
pub type HistoryLog = BTreeMap<NaiveDate, u32>;

/// Interface for abstracting persistence of the history log.
#[cfg_attr(test, mockall::automock)]
pub trait HistoryStorage {
    /// Reads the whole log. A log that was never written is empty.
    fn load(&self) -> Result<HistoryLog, StoreError>;

    /// Replaces the whole log.
    fn save(&self, log: &HistoryLog) -> Result<(), StoreError>;

    /// Moves an unreadable log out of the way, the next save starts a new one.
    fn set_aside(&self) -> Result<(), StoreError>;
}

impl<T: Deref> HistoryStorage for T
where
    T::Target: HistoryStorage,
{
    fn load(&self) -> Result<HistoryLog, StoreError> {
        self.deref().load()
    }

    fn save(&self, log: &HistoryLog) -> Result<(), StoreError> {
        self.deref().save(log)
    }

    fn set_aside(&self) -> Result<(), StoreError> {
        self.deref().set_aside()
    }
}

/// The main realization of [HistoryStorage], a single JSON file.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(HISTORY_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [HistoryStorage::set_aside] moves the log, `drinking_history.json.corrupt`.
    pub fn set_aside_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".");
        name.push(SET_ASIDE_SUFFIX);
        PathBuf::from(name)
    }
}

impl HistoryStorage for HistoryStore {
    fn load(&self) -> Result<HistoryLog, StoreError> {
        match std::fs::read(&self.path) {
            Ok(content) => {
                serde_json::from_slice(&content).map_err(|e| StoreError::parse(&self.path, e))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history at {:?}", self.path);
                Ok(HistoryLog::new())
            }
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    fn save(&self, log: &HistoryLog) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec_pretty(log).map_err(|e| StoreError::serialize(&self.path, e))?;
        write_atomically(&self.path, &payload).map_err(|e| StoreError::io(&self.path, e))?;
        debug!("Saved {} history entries", log.len());
        Ok(())
    }

    fn set_aside(&self) -> Result<(), StoreError> {
        let target = self.set_aside_path();
        match std::fs::rename(&self.path, &target) {
            Ok(()) => {
                warn!("Moved unreadable history to {target:?}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}
