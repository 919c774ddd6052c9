use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing subscriber once per process.
///
/// `GOFIX_LOG` takes precedence over `RUST_LOG`; without either the
/// default filter is `gofix=info`.
pub fn init_logging() {
    init_logging_with(None);
}

/// Like [`init_logging`], but an explicit filter directive (from `--log`
/// or the config file) wins over the environment.
pub fn init_logging_with(directive: Option<&str>) {
    INIT.call_once(|| {
        let env_filter = directive
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .or_else(|| EnvFilter::try_from_env("GOFIX_LOG").ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("gofix=info"));

        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    });
}
