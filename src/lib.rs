//! meterplay: a single-track playback engine with a metered amplitude
//! signal, progress reporting and playlist navigation.

pub mod audio;
pub mod config;
pub mod error;
pub mod library;
pub mod runtime;
