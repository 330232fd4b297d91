// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Persisted key-value settings

use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Settings storage errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O error")]
    Io(#[from] io::Error),
    #[error("settings (de)serialization error")]
    Json(#[from] serde_json::Error),
}

/// A persistent key-value store
///
/// Values are opaque bytes. Each `store` must be durable before it returns.
pub trait SettingsStore {
    /// Load the value stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError>;

    /// Store `value` under `key`, replacing any previous value
    fn store(&mut self, key: &str, value: &[u8]) -> Result<(), SettingsError>;
}

/// In-memory settings
///
/// Nothing survives the process; clones share nothing.
#[derive(Clone, Debug, Default)]
pub struct MemorySettings {
    values: HashMap<String, Vec<u8>>,
}

impl SettingsStore for MemorySettings {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        Ok(self.values.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Settings stored in a single JSON file
///
/// The file holds one object mapping each key to its value, stored as a
/// string when the value is UTF-8 and as an array of bytes otherwise. The
/// whole file is rewritten (atomically) on each store.
#[derive(Clone, Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum Value {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        }
    }
}

impl From<Value> for Vec<u8> {
    fn from(value: Value) -> Self {
        match value {
            Value::Text(s) => s.into_bytes(),
            Value::Bytes(b) => b,
        }
    }
}

impl JsonFileSettings {
    /// Construct over the file at `path`
    ///
    /// The file (and its parent directory) is created on first store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSettings { path: path.into() }
    }

    /// The file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>, SettingsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError> {
        Ok(self.read_all()?.remove(key).map(Vec::from))
    }

    fn store(&mut self, key: &str, value: &[u8]) -> Result<(), SettingsError> {
        // The file is rewritten in full, so a corrupt file is replaced
        let mut all = match self.read_all() {
            Ok(all) => all,
            Err(SettingsError::Json(err)) => {
                warn!("replacing corrupt settings file {}: {err}", self.path.display());
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        all.insert(key.to_string(), Value::from(value));
        let json = serde_json::to_vec_pretty(&all)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
