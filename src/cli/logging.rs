//! Log subscriber setup
//!
//! Logs go to stderr so converted SQL can be piped from stdout.

use tracing_subscriber::EnvFilter;

/// Filter used with `--verbose`
const VERBOSE_FILTER: &str = "migrateiq=debug,info";

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "info";

/// Pick the filter directives
///
/// `--verbose` wins over `RUST_LOG`.
pub fn filter_directives(verbose: bool, rust_log: Option<&str>) -> String {
    if verbose {
        return VERBOSE_FILTER.to_string();
    }
    match rust_log.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives.to_string(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(verbose, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directives)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| anyhow::anyhow!("invalid log filter '{directives}': {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
