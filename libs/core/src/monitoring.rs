//! Monitoring template rendering and blackbox target registration.
use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::ProductConfig;
use crate::resource::Object;

pub const TEMPLATE_NAMESPACE_PARAM: &str = "Namespace";
pub const TEMPLATE_MONITORING_KEY_PARAM: &str = "MonitoringKey";
/// Label stamped on rendered templates so the monitoring stack selects them.
pub const MONITORING_KEY_LABEL: &str = "monitoring-key";

#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Renders the named template into an object ready to create.
    async fn render(&self, template: &str, params: &BTreeMap<String, String>) -> Result<Object>;
}

/// Endpoint probed by the blackbox exporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackboxTarget {
    pub url: String,
    pub service: String,
}

#[async_trait]
pub trait MonitoringRegistrar: Send + Sync {
    async fn register_blackbox_target(
        &self,
        name: &str,
        target: &BlackboxTarget,
        monitoring: &ProductConfig,
    ) -> Result<()>;
}

/// Renders from a fixed set of template objects: the namespace comes from the
/// `Namespace` parameter and the `MonitoringKey` parameter becomes a label.
#[derive(Default)]
pub struct StaticTemplateRenderer {
    templates: BTreeMap<String, Object>,
}

impl StaticTemplateRenderer {
    pub fn new(templates: impl IntoIterator<Item = (String, Object)>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }

    pub fn templates(&self) -> &BTreeMap<String, Object> {
        &self.templates
    }
}

#[async_trait]
impl TemplateRenderer for StaticTemplateRenderer {
    async fn render(&self, template: &str, params: &BTreeMap<String, String>) -> Result<Object> {
        let mut object = self
            .templates
            .get(template)
            .cloned()
            .ok_or_else(|| anyhow!("unknown monitoring template {template}"))?;
        if let Some(namespace) = params.get(TEMPLATE_NAMESPACE_PARAM) {
            object.metadata.namespace = namespace.clone();
        }
        if let Some(key) = params.get(TEMPLATE_MONITORING_KEY_PARAM) {
            object
                .metadata
                .labels
                .insert(MONITORING_KEY_LABEL.to_string(), key.clone());
        }
        Ok(object)
    }
}

#[derive(Default)]
pub struct InMemoryMonitoring {
    targets: RwLock<BTreeMap<String, BlackboxTarget>>,
}

impl InMemoryMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(targets: BTreeMap<String, BlackboxTarget>) -> Self {
        Self {
            targets: RwLock::new(targets),
        }
    }

    pub async fn targets(&self) -> BTreeMap<String, BlackboxTarget> {
        self.targets.read().await.clone()
    }
}

#[async_trait]
impl MonitoringRegistrar for InMemoryMonitoring {
    async fn register_blackbox_target(
        &self,
        name: &str,
        target: &BlackboxTarget,
        _monitoring: &ProductConfig,
    ) -> Result<()> {
        self.targets
            .write()
            .await
            .insert(name.to_string(), target.clone());
        Ok(())
    }
}
