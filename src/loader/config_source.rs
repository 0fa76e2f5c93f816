//! Configuration Service
//!
//! Serves values from the `config-<profile>.json` document, loaded once per
//! environment through the cached loader.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::Environment;
use crate::error::{Result, TransportError};
use crate::loader::{CachedLoader, Fetch, LoaderStats};

/// Parsed configuration document.
pub type ConfigDocument = Map<String, Value>;

// == File Config Source ==
/// Reads configuration profiles from a directory.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    dir: PathBuf,
}

impl FileConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, environment: Environment) -> PathBuf {
        self.dir.join(format!("config-{}.json", environment.profile()))
    }
}

fn unreadable(path: &std::path::Path, cause: impl ToString) -> TransportError {
    TransportError::new("Unable to access config file").with_details(json!({
        "path": path.display().to_string(),
        "cause": cause.to_string(),
    }))
}

#[async_trait]
impl Fetch<Environment, Arc<ConfigDocument>> for FileConfigSource {
    async fn fetch(&self, environment: &Environment) -> std::result::Result<Arc<ConfigDocument>, TransportError> {
        let path = self.path_for(*environment);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| unreadable(&path, e))?;
        let document: ConfigDocument =
            serde_json::from_slice(&bytes).map_err(|e| unreadable(&path, e))?;

        info!(path = %path.display(), keys = document.len(), "Configuration loaded");
        Ok(Arc::new(document))
    }
}

// == Config Service ==
/// Key lookups over the configuration document of one environment.
#[derive(Clone)]
pub struct ConfigService {
    loader: CachedLoader<Environment, Arc<ConfigDocument>>,
    environment: Environment,
}

impl ConfigService {
    pub fn new(
        fetcher: Arc<dyn Fetch<Environment, Arc<ConfigDocument>>>,
        environment: Environment,
    ) -> Self {
        Self {
            loader: CachedLoader::new(fetcher),
            environment,
        }
    }

    /// Service reading `config-<profile>.json` files from `dir`.
    pub fn from_dir(dir: impl Into<PathBuf>, environment: Environment) -> Self {
        Self::new(Arc::new(FileConfigSource::new(dir)), environment)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    async fn document(&self) -> Result<Arc<ConfigDocument>> {
        self.loader.get(self.environment).await
    }

    /// Value stored under `key`, or `None` when the document lacks it.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.document().await?.get(key).cloned())
    }

    /// Values for every listed key present in the document, in the
    /// document's key order.
    pub async fn get_many(&self, keys: &[&str]) -> Result<Vec<Value>> {
        let document = self.document().await?;
        Ok(document
            .iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .map(|(_, value)| value.clone())
            .collect())
    }

    /// Drops the cached document and loads it again.
    pub async fn reload(&self) -> Result<Arc<ConfigDocument>> {
        self.loader.invalidate(&self.environment);
        self.document().await
    }

    pub fn stats(&self) -> LoaderStats {
        self.loader.stats()
    }
}
