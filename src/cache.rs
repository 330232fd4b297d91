// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Cache of resolved managed-font paths
//!
//! After a managed font is resolved and verified usable, the provider's path
//! to the font file is recorded here. The mapping is a hint: an entry means
//! the font was obtained before, not that it is usable now.

use crate::{SettingsError, SettingsStore};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings key holding the serialized mapping
pub const RESOLVED_PATHS_KEY: &str = "resolved_font_paths";

/// Persisted mapping from font name to provider path
pub struct ResolvedFontCache {
    store: Box<dyn SettingsStore>,
    paths: BTreeMap<String, PathBuf>,
}

impl ResolvedFontCache {
    /// Load from `store`
    ///
    /// A missing or unreadable entry yields an empty cache.
    pub fn load(store: Box<dyn SettingsStore>) -> Self {
        let paths = match Self::read(&*store) {
            Ok(paths) => paths,
            Err(err) => {
                warn!("ignoring unreadable resolved font cache: {err}");
                BTreeMap::new()
            }
        };
        debug!("loaded {} resolved font path(s)", paths.len());
        ResolvedFontCache { store, paths }
    }

    fn read(store: &dyn SettingsStore) -> Result<BTreeMap<String, PathBuf>, SettingsError> {
        match store.load(RESOLVED_PATHS_KEY)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Get the recorded path for `name`
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.paths.get(name).map(PathBuf::as_path)
    }

    /// True if `name` has an entry
    pub fn contains(&self, name: &str) -> bool {
        self.paths.contains_key(name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Record `path` for `name` and persist the whole mapping
    ///
    /// The in-memory entry is kept even if persisting fails.
    pub fn insert(&mut self, name: &str, path: PathBuf) -> Result<(), SettingsError> {
        self.paths.insert(name.to_string(), path);
        let bytes = serde_json::to_vec(&self.paths)?;
        self.store.store(RESOLVED_PATHS_KEY, &bytes)
    }
}
