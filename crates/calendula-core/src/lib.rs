pub mod app;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod theme;

pub use app::App;
pub use config::{CalendarConfig, Config, ConfigIssue, StorageConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError};
pub use notify::{Signal, SubscriptionId};
pub use storage::{DeferredWriter, KeyValueStore, MemoryStore, SqliteStore};
pub use theme::{Theme, ThemeStore};

use anyhow::Result;

/// Initialize logging.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Calendula core initialized");
    Ok(())
}
