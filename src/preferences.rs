use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remembers which governor id each chat user last asked about.
pub trait PreferenceStore {
    fn get(&self, author: &str) -> Result<Option<u64>, PreferenceError>;
    fn set(&self, author: &str, governor_id: u64) -> Result<(), PreferenceError>;
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("read preferences {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse preferences {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("write preferences {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferenceData {
    governors: HashMap<String, u64>,
}

/// JSON file keyed by author id. Read on every lookup so edits from other
/// processes are picked up.
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<PreferenceData, PreferenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| PreferenceError::Parse {
                    path: self.path.clone(),
                    source,
                })
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PreferenceData::default()),
            Err(source) => Err(PreferenceError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, data: &PreferenceData) -> Result<(), PreferenceError> {
        let write_err = |source| PreferenceError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let bytes = serde_json::to_vec_pretty(data).map_err(io::Error::other).map_err(write_err)?;
        fs::write(&self.path, bytes).map_err(write_err)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, author: &str) -> Result<Option<u64>, PreferenceError> {
        Ok(self.load()?.governors.get(author).copied())
    }

    fn set(&self, author: &str, governor_id: u64) -> Result<(), PreferenceError> {
        let mut data = self.load()?;
        if data.governors.get(author) == Some(&governor_id) {
            return Ok(());
        }
        data.governors.insert(author.to_string(), governor_id);
        self.save(&data)
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    governors: std::cell::RefCell<HashMap<String, u64>>,
}

#[cfg(test)]
impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, author: &str) -> Result<Option<u64>, PreferenceError> {
        Ok(self.governors.borrow().get(author).copied())
    }

    fn set(&self, author: &str, governor_id: u64) -> Result<(), PreferenceError> {
        self.governors
            .borrow_mut()
            .insert(author.to_string(), governor_id);
        Ok(())
    }
}
