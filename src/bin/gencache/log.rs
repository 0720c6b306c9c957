use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{Layer as _, layer::SubscriberExt as _};

/// Build the process-wide tracing subscriber: pretty output to stderr,
/// filtered by `GENCACHE_LOG`, falling back to `info` when unset.
pub fn make_logger(debug: bool) -> impl tracing::Subscriber {
    let default_level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry().with(ErrorLayer::default()).with(
        tracing_subscriber::fmt::layer()
            .with_level(true)
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .with_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(default_level.parse().unwrap())
                    .with_env_var("GENCACHE_LOG")
                    .from_env_lossy(),
            ),
    )
}
