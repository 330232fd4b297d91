// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! On-disk store of downloaded fonts
//!
//! Each custom font is stored as one file named exactly after the font. No
//! extension is added or expected. The directory is created on first write.

use log::{debug, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Font directory errors
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The font name cannot be used as a file name
    #[error("invalid font file name `{0}`")]
    InvalidName(String),
    /// A filesystem operation failed
    #[error("font directory I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DirectoryError {
    fn io(path: &Path, source: io::Error) -> Self {
        DirectoryError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The directory holding downloaded custom fonts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontDirectory {
    root: PathBuf,
}

impl FontDirectory {
    /// Construct over `root`
    ///
    /// The directory is not touched until first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FontDirectory { root: root.into() }
    }

    /// The directory path
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file for font `name`
    pub fn path_for(&self, name: &str) -> Result<PathBuf, DirectoryError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(DirectoryError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// True if a file exists for font `name`
    pub fn contains(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|path| path.is_file())
    }

    /// Create the directory if it does not exist
    pub fn ensure_exists(&self) -> Result<(), DirectoryError> {
        if !self.root.is_dir() {
            fs::create_dir_all(&self.root).map_err(|e| DirectoryError::io(&self.root, e))?;
            debug!("created font directory {}", self.root.display());
        }
        Ok(())
    }

    /// Read the stored file for font `name`
    pub fn read(&self, name: &str) -> Result<Vec<u8>, DirectoryError> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|e| DirectoryError::io(&path, e))
    }

    /// Write `data` as the file for font `name`
    ///
    /// The file is written to a temporary file in the same directory, then
    /// renamed, thus readers never observe a partial file.
    pub fn write_atomic(&self, name: &str, data: &[u8]) -> Result<PathBuf, DirectoryError> {
        let path = self.path_for(name)?;
        self.ensure_exists()?;

        let mut temp =
            NamedTempFile::new_in(&self.root).map_err(|e| DirectoryError::io(&self.root, e))?;
        temp.write_all(data)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| DirectoryError::io(temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| DirectoryError::io(&path, e.error))?;

        debug!("wrote {} bytes to {}", data.len(), path.display());
        Ok(path)
    }

    /// Remove the file for font `name`
    pub fn remove(&self, name: &str) -> Result<(), DirectoryError> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|e| DirectoryError::io(&path, e))
    }

    /// List the names of stored fonts
    ///
    /// A missing directory is empty. Entries which are not regular files or
    /// whose names are not valid UTF-8 are skipped.
    pub fn list(&self) -> Result<Vec<String>, DirectoryError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(DirectoryError::io(&self.root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DirectoryError::io(&self.root, e))?;
            if !entry.file_type().is_ok_and(|ty| ty.is_file()) {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!("skipping non-UTF-8 font file {name:?}"),
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_names() {
        let dir = FontDirectory::new("/tmp/fonts");
        for name in ["", ".", "..", "a/b", "..\\x", "nul\0"] {
            assert!(matches!(
                dir.path_for(name),
                Err(DirectoryError::InvalidName(_))
            ));
        }
        assert_eq!(
            dir.path_for("Acme-Bold").unwrap(),
            Path::new("/tmp/fonts/Acme-Bold")
        );
    }

    #[test]
    fn write_read_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = FontDirectory::new(tmp.path().join("fonts"));
        assert_eq!(dir.list().unwrap(), Vec::<String>::new());
        assert!(!dir.contains("Acme-Bold"));

        let path = dir.write_atomic("Acme-Bold", &[1, 2, 3]).unwrap();
        assert!(path.is_file());
        assert!(dir.contains("Acme-Bold"));
        assert_eq!(dir.read("Acme-Bold").unwrap(), vec![1, 2, 3]);

        dir.write_atomic("Acme-Bold", &[4]).unwrap();
        assert_eq!(dir.read("Acme-Bold").unwrap(), vec![4]);
        assert_eq!(dir.list().unwrap(), vec!["Acme-Bold".to_string()]);

        dir.remove("Acme-Bold").unwrap();
        assert!(!dir.contains("Acme-Bold"));
        assert!(dir.remove("Acme-Bold").is_err());
    }

    #[test]
    fn list_skips_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = FontDirectory::new(tmp.path());
        fs::create_dir(tmp.path().join("nested")).unwrap();
        dir.write_atomic("B", b"b").unwrap();
        dir.write_atomic("A", b"a").unwrap();
        assert_eq!(dir.list().unwrap(), vec!["A".to_string(), "B".to_string()]);
    }
}
