//! Product configuration records and the stores that persist them.
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ConfigError;

pub const NAMESPACE_KEY: &str = "NAMESPACE";
pub const REALM_KEY: &str = "REALM";
pub const HOST_KEY: &str = "HOST";
pub const VERSION_KEY: &str = "VERSION";
pub const OPERATOR_VERSION_KEY: &str = "OPERATOR";
pub const TEMPLATE_LIST_KEY: &str = "TEMPLATE_LIST";
pub const LABEL_SELECTOR_KEY: &str = "LABEL_SELECTOR";

pub const DEFAULT_LABEL_SELECTOR: &str = "middleware";

/// String key/value configuration owned by a single product.
///
/// ```
/// use sso_core::ProductConfig;
///
/// let mut config = ProductConfig::new("rhsso");
/// assert_eq!(config.label_selector(), "middleware");
/// config.set_template_list(["kube-state-metrics", "endpoints"]);
/// assert_eq!(config.template_list(), vec!["kube-state-metrics", "endpoints"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConfig {
    product: String,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

impl ProductConfig {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_values(mut self, values: BTreeMap<String, String>) -> Self {
        self.values = values;
        self
    }

    pub fn product_name(&self) -> &str {
        &self.product
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn namespace(&self) -> &str {
        self.get(NAMESPACE_KEY)
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.set(NAMESPACE_KEY, namespace);
    }

    pub fn realm(&self) -> &str {
        self.get(REALM_KEY)
    }

    pub fn set_realm(&mut self, realm: impl Into<String>) {
        self.set(REALM_KEY, realm);
    }

    pub fn host(&self) -> &str {
        self.get(HOST_KEY)
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.set(HOST_KEY, host);
    }

    pub fn product_version(&self) -> &str {
        self.get(VERSION_KEY)
    }

    pub fn set_product_version(&mut self, version: impl Into<String>) {
        self.set(VERSION_KEY, version);
    }

    pub fn operator_version(&self) -> &str {
        self.get(OPERATOR_VERSION_KEY)
    }

    pub fn set_operator_version(&mut self, version: impl Into<String>) {
        self.set(OPERATOR_VERSION_KEY, version);
    }

    pub fn template_list(&self) -> Vec<String> {
        self.get(TEMPLATE_LIST_KEY)
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn set_template_list<I, S>(&mut self, templates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = templates
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.set(TEMPLATE_LIST_KEY, joined);
    }

    pub fn label_selector(&self) -> &str {
        match self.get(LABEL_SELECTOR_KEY) {
            "" => DEFAULT_LABEL_SELECTOR,
            selector => selector,
        }
    }

    pub fn set_label_selector(&mut self, selector: impl Into<String>) {
        self.set(LABEL_SELECTOR_KEY, selector);
    }
}

/// Read-modify-write store for product configuration. Callers must hold the
/// only writer for a product; the store provides no locking across calls.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns the stored configuration, or an empty record for an unknown product.
    async fn read(&self, product: &str) -> Result<ProductConfig, ConfigError>;
    async fn write(&self, config: &ProductConfig) -> Result<(), ConfigError>;
}

#[derive(Default)]
pub struct InMemoryConfigStore {
    records: RwLock<HashMap<String, ProductConfig>>,
    writes: AtomicUsize,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: impl IntoIterator<Item = ProductConfig>) -> Self {
        let records = configs
            .into_iter()
            .map(|config| (config.product.clone(), config))
            .collect();
        Self {
            records: RwLock::new(records),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful writes since construction.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn all(&self) -> Vec<ProductConfig> {
        let mut configs: Vec<_> = self.records.read().await.values().cloned().collect();
        configs.sort_by(|a, b| a.product.cmp(&b.product));
        configs
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn read(&self, product: &str) -> Result<ProductConfig, ConfigError> {
        Ok(self
            .records
            .read()
            .await
            .get(product)
            .cloned()
            .unwrap_or_else(|| ProductConfig::new(product)))
    }

    async fn write(&self, config: &ProductConfig) -> Result<(), ConfigError> {
        self.records
            .write()
            .await
            .insert(config.product.clone(), config.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Persists every product's configuration as a single pretty-printed JSON map.
pub struct FileConfigStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(
        &self,
        product: &str,
    ) -> Result<BTreeMap<String, BTreeMap<String, String>>, ConfigError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(ConfigError::Read {
                    product: product.to_string(),
                    reason: format!("read {}: {err}", self.path.display()),
                });
            }
        };
        serde_json::from_str(&raw).map_err(|err| ConfigError::Read {
            product: product.to_string(),
            reason: format!("parse {}: {err}", self.path.display()),
        })
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn read(&self, product: &str) -> Result<ProductConfig, ConfigError> {
        let _guard = self.lock.read().await;
        let mut products = self.load(product).await?;
        let values = products.remove(product).unwrap_or_default();
        Ok(ProductConfig::new(product).with_values(values))
    }

    async fn write(&self, config: &ProductConfig) -> Result<(), ConfigError> {
        let _guard = self.lock.write().await;
        let product = config.product_name();
        let write_err = |reason: String| ConfigError::Write {
            product: product.to_string(),
            reason,
        };
        let mut products = self.load(product).await?;
        products.insert(product.to_string(), config.values.clone());
        let payload = serde_json::to_string_pretty(&products)
            .map_err(|err| write_err(format!("serialize: {err}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| write_err(format!("create {}: {err}", parent.display())))?;
        }
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|err| write_err(format!("write {}: {err}", self.path.display())))?;
        debug!(product, path = %self.path.display(), "persisted product config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_list_ignores_blank_entries() {
        let mut config = ProductConfig::new("rhsso");
        config.set(TEMPLATE_LIST_KEY, "a, ,b,");
        assert_eq!(config.template_list(), vec!["a", "b"]);
    }

    #[test]
    fn label_selector_falls_back_to_default() {
        let mut config = ProductConfig::new("rhsso");
        config.set_label_selector("");
        assert_eq!(config.label_selector(), DEFAULT_LABEL_SELECTOR);
        config.set_label_selector("sso");
        assert_eq!(config.label_selector(), "sso");
    }

    #[tokio::test]
    async fn in_memory_store_returns_empty_config_for_unknown_product() {
        let store = InMemoryConfigStore::new();
        let config = store.read("monitoring").await.unwrap();
        assert_eq!(config.product_name(), "monitoring");
        assert!(config.values().is_empty());
        assert_eq!(store.write_count(), 0);
    }
}
