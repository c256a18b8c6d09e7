// =============================================================================
// Logging setup
// =============================================================================
//
// `RUST_LOG` always wins. Otherwise the binary picks its own default level:
// the server logs `info` to stdout, the CLI logs `warn` to stderr so the
// prompt and the terminal chart stay clean.
// =============================================================================

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// Install the global `tracing` subscriber.
pub fn init_logging(output: LogOutput, default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match output {
        LogOutput::Stdout => builder.try_init(),
        LogOutput::Stderr => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
