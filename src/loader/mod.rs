//! Loader Module
//!
//! Single-flight cached loading of configuration and reference data.

mod cached;
mod config_source;
mod entry;
mod stats;

pub use cached::{CachedLoader, Fetch};
pub use config_source::{ConfigDocument, ConfigService, FileConfigSource};
pub use stats::LoaderStats;
