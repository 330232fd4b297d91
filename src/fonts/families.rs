// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Generic and fallback font families
//!
//! `fontdb` does not choose a family for each generic category; we pick the
//! first available from a short list of preferred system families.
//!
//! Family ordering indicates usage preference.

use log::info;

/// Family substituted when a requested font cannot be used
pub const DEFAULT_FALLBACK_FAMILY: &str = "Helvetica";

const SERIF: &[&str] = &[
    "Georgia",
    "Times New Roman",
    "Times",
    "Noto Serif",
    "DejaVu Serif",
    "Liberation Serif",
];

const SANS_SERIF: &[&str] = &[
    "Helvetica",
    "Arial",
    "Noto Sans",
    "DejaVu Sans",
    "Roboto",
    "Liberation Sans",
];

const MONOSPACE: &[&str] = &[
    "Menlo",
    "Consolas",
    "Noto Sans Mono",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Courier New",
];

const CURSIVE: &[&str] = &["Apple Chancery", "Segoe Script", "Comic Sans MS"];

const FANTASY: &[&str] = &["Papyrus", "Impact", "Segoe Print"];

fn first_present<'a>(db: &fontdb::Database, names: &[&'a str]) -> Option<&'a str> {
    names.iter().copied().find(|name| {
        db.faces()
            .any(|face| face.families.iter().any(|(family, _)| family == name))
    })
}

/// Assign generic families in `db` from the preferred lists
///
/// Returns the number of generic families assigned.
pub fn assign_generic_families(db: &mut fontdb::Database) -> usize {
    let mut n = 0;
    if let Some(name) = first_present(db, SERIF) {
        info!("Default serif font: {name}");
        db.set_serif_family(name);
        n += 1;
    }
    if let Some(name) = first_present(db, SANS_SERIF) {
        info!("Default sans-serif font: {name}");
        db.set_sans_serif_family(name);
        n += 1;
    }
    if let Some(name) = first_present(db, MONOSPACE) {
        info!("Default monospace font: {name}");
        db.set_monospace_family(name);
        n += 1;
    }
    if let Some(name) = first_present(db, CURSIVE) {
        info!("Default cursive font: {name}");
        db.set_cursive_family(name);
        n += 1;
    }
    if let Some(name) = first_present(db, FANTASY) {
        info!("Default fantasy font: {name}");
        db.set_fantasy_family(name);
        n += 1;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_database() {
        let mut db = fontdb::Database::new();
        assert_eq!(assign_generic_families(&mut db), 0);
    }
}
