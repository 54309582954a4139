//! Logging initialization for the CLI.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.
//! Logs always go to stderr so stdout stays clean for generated code and JSON.

use tracing::Level;
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `verbosity`: 0 = INFO, 1 = DEBUG, 2+ = TRACE. `RUST_LOG` is honored and
/// the verbosity flag is layered on top. With `json`, every event is one JSON
/// line on stderr.
pub fn init(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    for target in ["ladle_core", "ladle_cli"] {
        if let Ok(directive) = format!("{target}={level}").parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
