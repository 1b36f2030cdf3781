use std::env;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `warn`, `debug`,
/// `pgn_import=debug`).
pub const LOG_ENV: &str = "PGN_IMPORT_LOG";

const DEFAULT_FILTER: &str = "warn";

fn filter_from_env() -> EnvFilter {
    match env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            EnvFilter::try_new(directives.trim()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
        _ => EnvFilter::new(DEFAULT_FILTER),
    }
}

/// Installs the stderr subscriber. Later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn warn(msg: impl AsRef<str>) {
    tracing::warn!("{}", msg.as_ref());
}

pub fn debug(msg: impl AsRef<str>) {
    tracing::debug!("{}", msg.as_ref());
}
