//! Tracing subscriber setup for the `bylines` binary.
//!
//! Logs go to stderr so command output on stdout stays pipeable. The
//! filter comes from `BYLINES_LOG`, then `RUST_LOG`, then the `-v`/`-q`
//! flags (default `warn`). Unparseable directives fall through to the
//! next source.

use tracing_subscriber::EnvFilter;

/// Project-specific filter variable.
pub const LOG_ENV: &str = "BYLINES_LOG";

/// Install the global subscriber. Call once, before loading config.
pub fn init(verbose: bool, quiet: bool) -> anyhow::Result<()> {
    let filter = build_env_filter(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        flag_directive(verbose, quiet),
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

/// Directive used when neither environment variable is set. `-v` raises
/// the bylines crates to debug and leaves dependencies at warn.
fn flag_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "warn,bylines=debug,bylines_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

fn build_env_filter(project: Option<String>, rust_log: Option<String>, flags: &str) -> EnvFilter {
    [project, rust_log]
        .into_iter()
        .flatten()
        .find_map(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(flags))
}
