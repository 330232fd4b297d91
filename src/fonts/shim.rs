// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! On-demand registration from the font directory

use super::{is_available, Font, FontRegistry, RegisterError, PROBE_SIZE};
use crate::FontDirectory;
use log::{debug, warn};

/// Register the stored file for font `name`
///
/// If the file does not contain valid font data it is deleted, since it can
/// never be registered. Other failures leave the file in place.
pub fn register_file<R: FontRegistry + ?Sized>(
    registry: &mut R,
    dir: &FontDirectory,
    name: &str,
) -> Result<(), RegisterError> {
    let data = dir.read(name)?;
    match registry.register(data) {
        Ok(()) => {
            debug!("registered font file `{name}`");
            Ok(())
        }
        Err(err) => {
            warn!("failed to register font file `{name}`: {err}");
            if err.is_invalid_data() {
                if let Err(err) = dir.remove(name) {
                    warn!("failed to remove unregisterable font file: {err}");
                }
            }
            Err(err)
        }
    }
}

/// Construct a font by name, registering or substituting as required
///
/// This wraps [`FontRegistry::font`]:
///
/// 1.  If `name` is usable, construct it at `size`
/// 2.  Else if `dir` contains a file for `name`, register it and construct
///     `name` again (the result may be a substitute if registration failed)
/// 3.  Otherwise construct `fallback` at `size`
///
/// No network access is performed. Returns `None` if `size` is not positive
/// or nothing can be constructed.
pub fn dynamic_font<R: FontRegistry + ?Sized>(
    registry: &mut R,
    dir: &FontDirectory,
    fallback: &str,
    name: &str,
    size: f32,
) -> Option<Font> {
    if size.is_nan() || size <= 0.0 {
        return None;
    }

    if is_available(registry, name) {
        return registry.font(name, size);
    }

    if dir.contains(name) {
        let _ = register_file(registry, dir, name);
        if let Some(font) = registry.font(name, size) {
            return Some(font);
        }
    }

    debug!("font `{name}` unavailable (probe size {PROBE_SIZE}); using `{fallback}`");
    registry.font(fallback, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use ttf_parser::FaceParsingError;

    /// Registers data as the UTF-8 font name it contains
    #[derive(Default)]
    struct Names(HashSet<String>);

    impl FontRegistry for Names {
        fn register(&mut self, data: Vec<u8>) -> Result<(), RegisterError> {
            let name = String::from_utf8(data).map_err(|_| FaceParsingError::UnknownMagic)?;
            self.0.insert(name);
            Ok(())
        }

        fn font(&self, name: &str, size: f32) -> Option<Font> {
            self.0
                .contains(name)
                .then(|| Font::new(name, name, size))
        }
    }

    fn setup() -> (tempfile::TempDir, FontDirectory, Names) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = FontDirectory::new(tmp.path());
        let mut names = Names::default();
        names.0.insert("Helvetica".to_string());
        (tmp, dir, names)
    }

    #[test]
    fn available() {
        let (_tmp, dir, mut reg) = setup();
        reg.0.insert("Acme".to_string());
        let font = dynamic_font(&mut reg, &dir, "Helvetica", "Acme", 20.0).unwrap();
        assert_eq!(font, Font::new("Acme", "Acme", 20.0));
    }

    #[test]
    fn register_from_directory() {
        let (_tmp, dir, mut reg) = setup();
        dir.write_atomic("Acme", b"Acme").unwrap();
        let font = dynamic_font(&mut reg, &dir, "Helvetica", "Acme", 20.0).unwrap();
        assert_eq!(font.family(), "Acme");
        assert!(is_available(&reg, "Acme"));
    }

    #[test]
    fn invalid_file_removed() {
        let (_tmp, dir, mut reg) = setup();
        dir.write_atomic("Acme", &[0xff, 0xfe]).unwrap();
        let font = dynamic_font(&mut reg, &dir, "Helvetica", "Acme", 20.0).unwrap();
        assert_eq!(font.family(), "Helvetica");
        assert!(!dir.contains("Acme"));
    }

    #[test]
    fn fallback() {
        let (_tmp, dir, mut reg) = setup();
        let font = dynamic_font(&mut reg, &dir, "Helvetica", "Missing", 9.0).unwrap();
        assert_eq!(font, Font::new("Helvetica", "Helvetica", 9.0));
        assert_eq!(dynamic_font(&mut reg, &dir, "Nope", "Missing", 9.0), None);
    }

    #[test]
    fn bad_size() {
        let (_tmp, dir, mut reg) = setup();
        assert_eq!(dynamic_font(&mut reg, &dir, "Helvetica", "Helvetica", 0.0), None);
        assert_eq!(dynamic_font(&mut reg, &dir, "Helvetica", "Helvetica", f32::NAN), None);
    }
}
