//! Logging for Recall.
//!
//! Diagnostics go to stderr through `tracing`. Stdout carries only command
//! output (result listings, `--json` documents, the chat prompt), so it can be
//! piped into other tools while logs stay on the terminal.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Level used when neither `--log-level` nor `RUST_LOG` is set.
const DEFAULT_LEVEL: &str = "info";

/// HTTP client internals stay at `warn` unless a directive names them.
const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "h2"];

/// Build the filter directive for a requested level.
///
/// A bare level (`debug`) is widened with the quiet targets; anything with
/// `=` or `,` is taken as a full directive and used unchanged.
fn filter_directive(log_level: Option<&str>) -> String {
    let requested = log_level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    if requested.contains('=') || requested.contains(',') {
        return requested;
    }

    std::iter::once(requested)
        .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber writing to stderr.
///
/// `log_level` comes from `--log-level`, `-v` (which maps to `debug`) or the
/// config file. Colour is off when `no_color` is set, `NO_COLOR` is present
/// or `TERM=dumb`.
///
/// # Example
/// ```no_run
/// use recall_core::logging::init_logging;
///
/// init_logging(Some("debug"), true).expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let directive = filter_directive(log_level);
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color && supports_color());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::env::var("TERM").map_or(true, |term| term != "dumb")
}
