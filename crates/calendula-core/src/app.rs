use std::sync::Arc;

use crate::error::AppError;
use crate::storage::{DeferredWriter, KeyValueStore, SqliteStore};
use crate::Config;

/// Shared application context.
///
/// Owns the configuration, the local key-value store and the deferred
/// writer that services stage their persistence through. The front-end calls
/// [`App::tick`] once per event-loop iteration.
pub struct App {
    config: Arc<Config>,
    store: Arc<dyn KeyValueStore>,
    writer: DeferredWriter,
}

impl App {
    /// Load the validated configuration and open the on-disk store.
    pub fn new() -> Result<Self, AppError> {
        let config = Config::load_validated()?;

        std::fs::create_dir_all(&config.storage.data_dir)?;
        let db_path = config.storage.database_path();
        let store = SqliteStore::open(&db_path)?;

        tracing::info!("Opened local store at {}", db_path.display());
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Build a context around an existing store.
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let writer = DeferredWriter::new(store.clone());
        Self {
            config: Arc::new(config),
            store,
            writer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn writer(&self) -> &DeferredWriter {
        &self.writer
    }

    /// The configured API credential, if any.
    pub fn api_key(&self) -> Option<String> {
        self.config.weather.effective_api_key()
    }

    /// End of an event-loop iteration: flush staged writes.
    ///
    /// Storage failures are logged, never fatal.
    pub fn tick(&self) {
        if let Err(e) = self.writer.flush() {
            tracing::error!("Failed to persist local state: {}", e);
        }
    }

    /// Flush remaining writes before exit.
    pub fn shutdown(&self) -> Result<(), AppError> {
        tracing::info!("Shutting down");
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::storage::{MemoryStore, THEME_KEY};

    #[test]
    fn test_tick_flushes_staged_writes() {
        let store = Arc::new(MemoryStore::new());
        let app = App::with_store(Config::default(), store.clone());

        app.writer().stage(THEME_KEY, "dark".into());
        assert!(store.is_empty());

        app.tick();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_shutdown_flushes() {
        let store = Arc::new(MemoryStore::new());
        let app = App::with_store(Config::default(), store.clone());

        app.writer().stage(THEME_KEY, "light".into());
        app.shutdown().unwrap();
        assert_eq!(store.len(), 1);
    }
}
