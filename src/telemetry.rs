//! Logging setup

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global fmt subscriber once per process.
///
/// `RUST_LOG` takes precedence over `default_level`.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        if let Err(e) = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
        {
            eprintln!("logging already initialised: {}", e);
        }
    });
}
