use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the stderr subscriber. `RUST_LOG` wins over the configured filter.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .ok();
}
