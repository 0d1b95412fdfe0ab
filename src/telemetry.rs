use tracing_subscriber::EnvFilter;

use crate::settings::LoggingSettings;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Also bridges `log` records, which is what actix's `Logger` middleware emits.
pub fn init(settings: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
