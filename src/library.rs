//! Track catalog: the track model, the playlist that owns it, and the ways a
//! playlist gets built (directory scan or TOML catalog) and resolved.

mod catalog;
mod model;
mod playlist;
mod resolve;
mod scan;

pub use catalog::{CATALOG_FILE_NAME, load_catalog, parse_catalog};
pub use model::{Track, TrackId};
pub use playlist::Playlist;
pub use resolve::MediaResolver;
pub use scan::scan;

#[cfg(test)]
mod tests;
