// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font availability

use super::FontRegistry;

/// Nominal size (points) used to probe a registry
pub const PROBE_SIZE: f32 = 12.0;

/// Check whether `name` is usable for rendering
///
/// A probe font is constructed at [`PROBE_SIZE`]. The name is usable only if
/// the resolved face or family name is exactly `name`; a substitute chosen by
/// the registry does not count.
pub fn is_available<R: FontRegistry + ?Sized>(registry: &R, name: &str) -> bool {
    registry
        .font(name, PROBE_SIZE)
        .is_some_and(|font| font.matches_name(name))
}
