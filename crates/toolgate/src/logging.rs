//! Logging initialization.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str =
    "toolgate=info,toolgate_mcp=info,toolgate_auth=info,toolgate_provider=info,tower_http=info";

const VERBOSE_FILTER: &str =
    "toolgate=debug,toolgate_mcp=debug,toolgate_auth=debug,toolgate_provider=debug,tower_http=debug";

/// Initialize logging to stdout.
///
/// `RUST_LOG` takes precedence over the built-in filters.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .init();
}
