use tracing_subscriber::EnvFilter;

/// Install the global diagnostic subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence. Otherwise only warnings are shown, or this
/// crate's debug events when `verbose` is set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,version_sync=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    // a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
