/// Record Bridge - relays UI port messages to a hosted auth + document backend
///
/// The UI sends login and record requests as port messages; the bridge
/// turns each into one backend call and answers with one normalized
/// response. Authentication and storage stay with the hosted service.

// Module declarations
pub mod error;
pub mod core;
pub mod backend;
pub mod bridge;
pub mod ui;

// Re-export commonly used types
pub use error::{BridgeError, Result};
pub use crate::core::{BridgeConfig, Credential, Record, RecordFields, SessionChange};
pub use backend::{Backend, MemoryBackend, RestBackend};
pub use bridge::{Bridge, Request, Response};

use bridge::StderrNotifier;
use std::path::PathBuf;
use std::sync::Arc;

/// Initialize logging infrastructure
///
/// Logs go to stderr; stdout carries the port stream.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Record Bridge starting...");
}

/// Config path from the command line, falling back to the environment
pub fn config_path(cli_arg: Option<String>) -> Option<PathBuf> {
    let non_blank = |p: &String| !p.trim().is_empty();

    cli_arg
        .filter(non_blank)
        .or_else(|| std::env::var(crate::core::config::CONFIG_PATH_ENV).ok().filter(non_blank))
        .map(PathBuf::from)
}

/// Main application entry point
///
/// Loads the configuration, connects the backend, and relays stdin to
/// stdout until the UI closes its end.
pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use anyhow::Context;

    let config = BridgeConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    let backend = backend::connect(&config).context("Failed to connect backend")?;

    ui::serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        backend,
        Arc::new(StderrNotifier),
    )
    .await
    .context("Port relay failed")?;

    tracing::info!("Record Bridge stopped");
    Ok(())
}
