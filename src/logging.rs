use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize structured JSON logging on stderr.
///
/// Defaults to `info` level (per-image progress) unless overridden by `ROLLCALL_LOG`.
pub fn init() {
    init_with_default(LevelFilter::INFO);
}

/// Like [`init`], but with a caller-chosen default level.
pub fn init_with_default(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_env_var("ROLLCALL_LOG")
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        )
        .try_init();
}
