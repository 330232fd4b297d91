// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Service configuration
//!
//! A [`Config`] may be constructed in code or deserialized from JSON. Missing
//! fields take their default values.

use crate::fonts::DEFAULT_FALLBACK_FAMILY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config")]
    Json(#[from] serde_json::Error),
}

/// Configuration of a [`FontAcquisitionService`](crate::FontAcquisitionService)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding downloaded custom fonts
    pub font_dir: PathBuf,
    /// File holding persisted settings (resolved managed-font paths)
    pub settings_path: PathBuf,
    /// `Referer` header sent with each custom font request
    pub referer: String,
    /// Family substituted by [`dynamic_font`](crate::FontAcquisitionService::dynamic_font)
    pub fallback_family: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::in_dir(".")
    }
}

impl Config {
    /// Default configuration storing all data under `root`
    ///
    /// Fonts are stored in `root/fonts` and settings in
    /// `root/font-settings.json`.
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Config {
            font_dir: root.join("fonts"),
            settings_path: root.join("font-settings.json"),
            referer: "http://app.wodedata.com".to_string(),
            fallback_family: DEFAULT_FALLBACK_FAMILY.to_string(),
        }
    }

    /// Parse from a JSON string
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
