//! Tracing setup for the `norsk-eval` binary.
//!
//! Logs always go to stderr; stdout is reserved for the console summary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// HTTP stack crates log every connection at debug; keep them at warn unless
/// `RUST_LOG` says otherwise.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "h2=warn"];

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: Level) -> String {
    let mut directive = level.as_str().to_ascii_lowercase();
    for dep in QUIET_DEPENDENCIES {
        directive.push(',');
        directive.push_str(dep);
    }
    directive
}

/// Install the global subscriber. `json` selects newline-delimited JSON
/// lines; `level` is the default verbosity.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // A subscriber set earlier (tests, embedding) wins.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
    };
}
