//! Tracing configuration for the CLI.
//!
//! Every entry written to a run context is also emitted as a tracing event,
//! so a live trace of the run goes to stderr while results go to stdout.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize stderr logging. The level is taken from `RUST_LOG`; without it
/// only warnings are shown, or debug output when `verbose` is set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "stepcase=debug,warn"
        } else {
            "stepcase=warn"
        })
    });

    // A host that already installed a subscriber keeps it.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(verbose)
                .compact(),
        )
        .try_init();
}
