use time::{format_description::parse, UtcOffset};
use tracing_subscriber::{fmt::time::OffsetTime, util::TryInitError, EnvFilter};

const TIME_FORMAT: &str = "[hour]:[minute]:[second].[subsecond digits:2]";

/// Install a compact `fmt` subscriber.
///
/// `RUST_LOG` wins over `log_level` when set, so a single run can be
/// switched to `RUST_LOG=drygate=trace` to follow every resolved check.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn setup_tracing(log_level: &str) -> Result<(), TryInitError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .compact();

    let registry = tracing_subscriber::registry().with(env_filter);

    match parse(TIME_FORMAT) {
        Ok(format) => {
            let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
            registry
                .with(layer.with_timer(OffsetTime::new(offset, format)))
                .try_init()
        }
        Err(_) => registry.with(layer).try_init(),
    }
}
