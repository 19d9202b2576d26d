//! Opt-in `tracing` subscriber for binaries and examples.
//!
//! The library itself only emits events; call [`setup_logger`] once from
//! `main` to print them. The level comes from the `LOGLEVEL` environment
//! variable (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`), defaulting to `INFO`.

use std::env;
use std::sync::Once;

use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

static INIT: Once = Once::new();

/// Installs a global formatting subscriber. Later calls are no-ops.
pub fn setup_logger() {
    INIT.call_once(|| {
        let level = level_from(env::var("LOGLEVEL").ok().as_deref());
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            debug!("log level set to {level}");
        }
    });
}

fn level_from(raw: Option<&str>) -> Level {
    match raw.map(|s| s.trim().to_uppercase()).as_deref() {
        Some("TRACE") => Level::TRACE,
        Some("DEBUG") => Level::DEBUG,
        Some("WARN") => Level::WARN,
        Some("ERROR") => Level::ERROR,
        _ => Level::INFO,
    }
}
