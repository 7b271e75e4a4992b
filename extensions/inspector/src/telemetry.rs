use tracing_subscriber::EnvFilter;

/// Initialize a stdout tracing subscriber for the debug server.
///
/// Honors `RUST_LOG`. Safe to call more than once; only the first call
/// installs a subscriber.
pub fn init_stdout_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mediary_runtime=debug"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
