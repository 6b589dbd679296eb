//! Shared primitives used across DocPortal crates.

mod color;
mod error;
mod location;

pub use color::ColorMode;
pub use color::EffectiveColorMode;
pub use error::PortalError;
pub use error::PortalResult;
pub use location::DocLocation;
pub use location::SearchParams;

/// Path prefix under which the server exposes pre-built documentation.
pub const STATIC_PROJECTS_PREFIX: &str = "/static/projects/";

/// Version token resolved to the newest concrete version before display.
pub const LATEST_ALIAS: &str = "latest";

/// Local storage key shared by the portal and embedded documentation themes.
pub const COLOR_MODE_STORAGE_KEY: &str = "darkMode";

/// Body the documentation server returns for a missing static page.
pub const NOT_FOUND_SENTINEL: &str = r#"{"detail":"Not Found"}"#;

/// User-facing text for a missing page inside the embedded frame.
pub const PAGE_NOT_FOUND_MESSAGE: &str = "Whoops! This page doesn't seem to exist...";
