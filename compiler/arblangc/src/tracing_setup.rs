//! Tracing initialization for the Arblang compiler CLI.
//!
//! Controlled by environment variables:
//! - `ARBLANG_LOG`: filter string (`RUST_LOG` syntax). Falls back to `RUST_LOG`.
//!
//! When neither is set, defaults to `info`, or `debug` when `-v`/`--verbose`
//! is passed on the command line. Grounded on `oric::tracing_setup`, minus
//! its `ORI_LOG_TREE`/`tracing_tree` branch: this workspace doesn't carry
//! that dependency, so there is only ever the plain `fmt` layer.

use std::sync::OnceLock;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing subscriber. Safe to call more than once — only
/// the first call takes effect.
pub fn init(verbose: bool) {
    INIT.get_or_init(|| {
        let default = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_env("ARBLANG_LOG")
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new(default));

        Registry::default()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .with(filter)
            .init();
    });
}
