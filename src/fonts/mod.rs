// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font registration and lookup
//!
//! Fonts are registered into, and looked up from, a [`FontRegistry`]. This is
//! the process-wide font table: once raw font data is registered, the fonts it
//! contains may be constructed by name. [`FontDb`] is the standard registry,
//! backed by a [`fontdb::Database`].
//!
//! ### Font names
//!
//! Throughout this library a font *name* is either the family name or the
//! PostScript name of a face. The registry's own constructor may match names
//! loosely (for example ignoring case); a name is only considered *usable*
//! when the resolved font reports exactly the requested name (see
//! [`is_available`]).
//!
//! ### Fallback
//!
//! [`dynamic_font`] wraps the registry's constructor, registering fonts from
//! a [`FontDirectory`](crate::FontDirectory) on demand and substituting a
//! fallback family when the requested name cannot be used.

mod availability;
mod database;
mod families;
mod registry;
mod shim;

pub use availability::{is_available, PROBE_SIZE};
pub use database::FontDb;
pub use families::{assign_generic_families, DEFAULT_FALLBACK_FAMILY};
pub use registry::{Font, FontRegistry, RegisterError};
pub use shim::{dynamic_font, register_file};
