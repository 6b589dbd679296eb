//! Href classification and frame address parsing.

mod frame_location;
mod sanitize;

pub use frame_location::FrameLocation;
pub use frame_location::parse_frame_location;
pub use sanitize::SanitizeResult;
pub use sanitize::Sanitizer;
pub use sanitize::resolve_against_base;
