// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! KAS dynamic fonts
//!
//! Acquire fonts which are not bundled with an application, register them for
//! rendering and remember them across restarts.
//!
//! Fonts come from two sources:
//!
//! -   *Custom* fonts are downloaded from a caller-supplied URL via a
//!     [`Transport`] (by default `HttpTransport`, with feature `http`),
//!     stored in a [`FontDirectory`] and registered
//! -   *Managed* fonts are resolved by name through a platform
//!     [`ManagedFontProvider`]; the provider's path to each resolved font is
//!     persisted in a [`ResolvedFontCache`]
//!
//! Both are orchestrated by a [`FontAcquisitionService`]:
//!
//! ```no_run
//! use kas_dynfont::{Callbacks, Config, FontAcquisitionService};
//!
//! let mut service = FontAcquisitionService::builder(Config::in_dir("/tmp/app")).build();
//! service.register_local_fonts();
//!
//! service.download_custom_font(
//!     "Acme-Bold",
//!     "https://example.org/acme-bold.ttf",
//!     Callbacks::new().on_complete(|c| println!("Acme-Bold: {c:?}")),
//! );
//! // From the application's event loop:
//! service.poll();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod callbacks;
mod config;
mod conv;
mod directory;
pub mod fonts;
#[cfg(feature = "http")]
mod http;
pub mod managed;
mod service;
mod settings;
pub mod transfer;

pub use cache::{ResolvedFontCache, RESOLVED_PATHS_KEY};
pub use callbacks::{Callbacks, Completion};
pub use config::{Config, ConfigError};
pub use conv::UNKNOWN_LENGTH;
pub use directory::{DirectoryError, FontDirectory};
pub use fonts::{Font, FontRegistry, RegisterError};
#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub use http::HttpTransport;
pub use managed::{ManagedFontProvider, MatchEvent, ProviderError, Subscription};
pub use service::{FontAcquisitionService, NoProvider, NoTransport, ServiceBuilder};
pub use settings::{JsonFileSettings, MemorySettings, SettingsError, SettingsStore};
pub use transfer::{TransferId, Transport, TransportError, TransportEvent};
