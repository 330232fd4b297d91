// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font registry interface

use crate::DirectoryError;
use thiserror::Error;

/// Font registration errors
#[derive(Error, Debug)]
pub enum RegisterError {
    /// The data is not a parseable font
    #[error("font parse error")]
    Parse(#[from] ttf_parser::FaceParsingError),
    /// A face with the same PostScript name is already registered
    #[error("font `{0}` is already registered")]
    AlreadyRegistered(String),
    /// The registry accepted no face from the data
    #[error("font data rejected by registry")]
    Rejected,
    /// The font file could not be read
    #[error("failed to read font file")]
    Read(#[from] DirectoryError),
}

impl RegisterError {
    /// True if the data itself is not a valid font
    ///
    /// Files producing this error will never register and may be discarded.
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, RegisterError::Parse(_))
    }
}

/// A constructed font
///
/// This is a lightweight description of a registered face at a given size:
/// the family and face names reported by the registry after resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    family: String,
    face_name: String,
    size: f32,
}

impl Font {
    /// Construct
    pub fn new(family: impl Into<String>, face_name: impl Into<String>, size: f32) -> Self {
        Font {
            family: family.into(),
            face_name: face_name.into(),
            size,
        }
    }

    /// The resolved family name
    #[inline]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// The resolved face (PostScript) name
    #[inline]
    pub fn face_name(&self) -> &str {
        &self.face_name
    }

    /// Size in points
    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Get the same font at another size
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// True if the family or face name equals `name` exactly
    ///
    /// The comparison is case-sensitive and ordinal.
    #[inline]
    pub fn matches_name(&self, name: &str) -> bool {
        self.face_name == name || self.family == name
    }
}

/// A table of registered fonts
///
/// This is the platform boundary of the library: registration of raw font
/// data and name-based font construction. Both operations are synchronous.
pub trait FontRegistry {
    /// Register raw font data
    ///
    /// On success, all faces within `data` may be constructed by name.
    fn register(&mut self, data: Vec<u8>) -> Result<(), RegisterError>;

    /// Construct a font by name
    ///
    /// The registry may resolve `name` loosely; callers requiring an exact
    /// match should check [`Font::matches_name`].
    fn font(&self, name: &str, size: f32) -> Option<Font>;
}

impl<R: FontRegistry + ?Sized> FontRegistry for Box<R> {
    fn register(&mut self, data: Vec<u8>) -> Result<(), RegisterError> {
        (**self).register(data)
    }

    fn font(&self, name: &str, size: f32) -> Option<Font> {
        (**self).font(name, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_name() {
        let font = Font::new("Acme", "Acme-Bold", 12.0);
        assert!(font.matches_name("Acme"));
        assert!(font.matches_name("Acme-Bold"));
        assert!(!font.matches_name("acme"));
        assert!(!font.matches_name("Acme Bold"));
    }

    #[test]
    fn with_size() {
        let font = Font::new("Acme", "Acme-Bold", 12.0).with_size(30.0);
        assert_eq!(font.size(), 30.0);
        assert_eq!(font.face_name(), "Acme-Bold");
    }

    #[test]
    fn invalid_data() {
        let err = RegisterError::Parse(ttf_parser::FaceParsingError::UnknownMagic);
        assert!(err.is_invalid_data());
        assert!(!RegisterError::Rejected.is_invalid_data());
    }
}
