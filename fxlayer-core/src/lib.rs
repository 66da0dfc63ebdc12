//! fxlayer core: FX snapshots, the raw → silver → gold transforms, and the
//! date-indexed artifact store.
//!
//! - Provider payload adapter and exchangerate-api.com client
//! - Normalizer (quality filter) and rebaser (pivot arithmetic)
//! - Parquet/JSON artifact store with write-then-rename
//! - Daily summary parsing and the text-generation client
//! - Display formatting and pipeline configuration

pub mod config;
pub mod data;
pub mod format;
pub mod summary;
pub mod textgen;

pub use config::{ConfigError, Credentials, PipelineConfig};
