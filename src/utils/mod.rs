//! Utility helpers: logging, profiling, and body-name lookup.

pub mod logging;
pub mod names;
pub mod profiling;

pub use names::resolve_matching_names;
pub use profiling::RefreshProfile;
