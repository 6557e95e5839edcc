//! Process logging setup
//!
//! The subscriber is installed before configuration is resolved, at a
//! bootstrap level, so warnings raised while loading the config file reach
//! the log. Once the configured level is known it is swapped in through a
//! reload handle. `RUST_LOG`, when set, always wins.

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Level used until configuration has been resolved
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Filter for `level` with HTTP request tracing kept at info
pub fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{},tower_http=info", level))
}

/// Handle for replacing the bootstrap filter with the configured one
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogFilterHandle {
    /// Apply the configured level unless `RUST_LOG` supplied the filter
    pub fn apply_level(&self, level: &str) {
        if self.from_env {
            return;
        }
        if let Err(e) = self.handle.reload(level_filter(level)) {
            tracing::warn!("Failed to apply configured log level {}: {}", level, e);
        }
    }
}

/// Build the layered subscriber writing to `writer`
///
/// `env_filter` is the filter from `RUST_LOG`, if any.
pub fn layered<W>(
    writer: W,
    env_filter: Option<EnvFilter>,
) -> (impl Subscriber + Send + Sync, LogFilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let from_env = env_filter.is_some();
    let (filter, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| level_filter(BOOTSTRAP_LEVEL)));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));

    (subscriber, LogFilterHandle { handle, from_env })
}

/// Install the global subscriber on stdout
pub fn init() -> LogFilterHandle {
    let (subscriber, handle) = layered(std::io::stdout, EnvFilter::try_from_default_env().ok());
    subscriber.init();
    handle
}
