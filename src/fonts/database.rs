// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font registry backed by `fontdb`

use super::{Font, FontRegistry, RegisterError};
use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use log::debug;
use std::sync::Arc;
use ttf_parser::{name_id, Face};

/// The standard [`FontRegistry`]
///
/// Wraps a [`fontdb::Database`]. Registered data is validated with
/// `ttf-parser` before it is loaded.
pub struct FontDb {
    db: Database,
}

impl Default for FontDb {
    fn default() -> Self {
        FontDb::new()
    }
}

impl FontDb {
    /// Construct an empty registry
    pub fn new() -> Self {
        FontDb {
            db: Database::new(),
        }
    }

    /// Construct, loading installed system fonts
    #[cfg(feature = "system-fonts")]
    pub fn with_system_fonts() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::info!("Found {} fonts", db.len());
        super::assign_generic_families(&mut db);
        FontDb { db }
    }

    /// Access the underlying database
    ///
    /// This may be used to render with the registered fonts elsewhere.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Number of registered faces
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// True if no faces are registered
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    fn is_registered(&self, post_script_name: &str) -> bool {
        self.db
            .faces()
            .any(|face| face.post_script_name == post_script_name)
    }
}

/// Read the PostScript name of each face in `data`
///
/// Fails if the first face does not parse.
fn post_script_names(data: &[u8]) -> Result<Vec<String>, RegisterError> {
    let n = ttf_parser::fonts_in_collection(data).unwrap_or(1).max(1);
    let mut names = Vec::new();
    for index in 0..n {
        let face = match Face::parse(data, index) {
            Ok(face) => face,
            Err(err) if index == 0 => return Err(err.into()),
            Err(_) => continue,
        };
        let name = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == name_id::POST_SCRIPT_NAME)
            .find_map(|name| name.to_string());
        if let Some(name) = name {
            names.push(name);
        }
    }
    Ok(names)
}

impl FontRegistry for FontDb {
    fn register(&mut self, data: Vec<u8>) -> Result<(), RegisterError> {
        let names = post_script_names(&data)?;
        if let Some(name) = names.iter().find(|name| self.is_registered(name)) {
            return Err(RegisterError::AlreadyRegistered(name.clone()));
        }

        let ids = self.db.load_font_source(Source::Binary(Arc::new(data)));
        if ids.is_empty() {
            return Err(RegisterError::Rejected);
        }
        debug!("registered {} face(s): {names:?}", ids.len());
        Ok(())
    }

    fn font(&self, name: &str, size: f32) -> Option<Font> {
        let families = [Family::Name(name)];
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };

        // Exact family, then exact PostScript name, then any family ignoring case
        let id = self
            .db
            .query(&query)
            .or_else(|| {
                self.db
                    .faces()
                    .find(|face| face.post_script_name == name)
                    .map(|face| face.id)
            })
            .or_else(|| {
                self.db
                    .faces()
                    .find(|face| {
                        face.families
                            .iter()
                            .any(|(family, _)| family.eq_ignore_ascii_case(name))
                    })
                    .map(|face| face.id)
            })?;

        let face = self.db.face(id)?;
        let family = face
            .families
            .iter()
            .find(|(family, _)| family == name)
            .or(face.families.first())
            .map(|(family, _)| family.as_str())
            .unwrap_or_default();
        Some(Font::new(family, face.post_script_name.as_str(), size))
    }
}
