use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

pub fn init() -> anyhow::Result<()> {
    let env = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let stdout = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_names(true);

    let registry = tracing_subscriber::registry().with(env).with(stdout);
    tracing::subscriber::set_global_default(registry)?;
    Ok(())
}

/// Trait for logging different kinds of errors
pub trait LogError {
    /// If this result is an error, log it as such
    fn log(self) -> Self;
}

impl<T> LogError for anyhow::Result<T> {
    fn log(self) -> Self {
        if let Err(err) = &self {
            tracing::error!("{err:#}");
        }
        self
    }
}
