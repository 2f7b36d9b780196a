// Log output for the command line tool
//
// Logs go to stderr so stdout stays a clean JSON document.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive used when `RUST_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "docatlas=debug"
    } else {
        "docatlas=warn"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose` when set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}
