//! Configuration loader and schema types.
//!
//! This module exposes the settings that tune the playback engine, the
//! library scanner and logging, plus helpers to load them from disk.

mod load;
mod schema;

pub use load::{default_config_path, resolve_config_path};
pub use schema::*;
