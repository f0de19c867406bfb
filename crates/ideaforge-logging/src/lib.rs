//! # ideaforge-logging
//!
//! Logging for the ideaforge generation loop.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured event logging
//! - [`LogEvent`] - Loop and stage events
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//!
//! Diagnostics from the provider and executor layers go through `tracing`;
//! [`init_tracing`] installs the subscriber for them.

mod events;

pub use events::{LogEvent, LogFormat, Logger, Stage};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the application. `RUST_LOG` overrides `level`.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
                .try_init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init();
        }
    }
}
