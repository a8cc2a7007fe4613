//! Shared test infrastructure: one-time tracing/error-report setup and raw
//! mainnet byte vectors for decoder tests.

use std::sync::Once;

use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub mod vectors;

static INIT: Once = Once::new();

/// Initialize global context for tests, once per process.
///
/// Installs a tracing subscriber honoring `RUST_LOG` and a color-eyre panic
/// report hook. Call at the top of every test.
pub fn init() {
    INIT.call_once(|| {
        let fmt_layer = fmt::layer().with_target(false);
        let filter_layer =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .init();

        color_eyre::install().expect("color-eyre installs once");
    })
}
