//! Local cluster backed by the in-memory collaborators and persisted as a
//! single JSON state file between passes.
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sso_core::{
    BlackboxTarget, ExternalAccount, Group, InMemoryConfigStore, InMemoryDirectory,
    InMemoryEventRecorder, InMemoryMonitoring, InMemoryNamespaces, InMemoryOAuthRegistrar,
    InMemoryResourceClient, InMemorySecretLookup, InMemorySubscriptions, Installation,
    InternalUser, NamespaceRecord, OAuthClient, Object, OwnershipTable, ProductConfig,
    ProductStatus, Realm, Resource, StaticTemplateRenderer, StatusEvent, StoredSecret,
    SubscriptionTarget,
};
use tracing::debug;

use crate::reconciler::Collaborators;
use crate::settings::REALM_NAME;

/// Serializable snapshot of everything the reconciler reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterState {
    pub installation: Installation,
    pub product: ProductStatus,
    /// Product name to configuration values.
    pub configs: BTreeMap<String, BTreeMap<String, String>>,
    pub objects: Vec<Object>,
    pub secrets: Vec<StoredSecret>,
    pub oauth_clients: Vec<OAuthClient>,
    pub accounts: Vec<ExternalAccount>,
    pub groups: Vec<Group>,
    pub namespaces: Vec<NamespaceRecord>,
    pub subscriptions: Vec<SubscriptionTarget>,
    pub templates: BTreeMap<String, Object>,
    pub blackbox_targets: BTreeMap<String, BlackboxTarget>,
    pub events: Vec<StatusEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconciled_at: Option<String>,
}

impl ClusterState {
    /// Users of the realm object, if one has been created.
    pub fn realm_users(&self) -> Result<Option<Vec<InternalUser>>> {
        let Some(object) = self
            .objects
            .iter()
            .find(|o| o.kind == Realm::KIND && o.metadata.name == REALM_NAME)
        else {
            return Ok(None);
        };
        let realm: Realm = object
            .decode()
            .with_context(|| format!("decode {}", object.key()))?;
        Ok(Some(realm.spec.realm.users))
    }
}

/// In-memory collaborators seeded from a [`ClusterState`].
#[derive(Default)]
pub struct LocalCluster {
    pub config: Arc<InMemoryConfigStore>,
    pub resources: Arc<InMemoryResourceClient>,
    pub secrets: Arc<InMemorySecretLookup>,
    pub oauth: Arc<InMemoryOAuthRegistrar>,
    pub directory: Arc<InMemoryDirectory>,
    pub namespaces: Arc<InMemoryNamespaces>,
    pub subscriptions: Arc<InMemorySubscriptions>,
    pub templates: Arc<StaticTemplateRenderer>,
    pub monitoring: Arc<InMemoryMonitoring>,
    pub events: Arc<InMemoryEventRecorder>,
    pub owners: Arc<OwnershipTable>,
}

impl LocalCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: &ClusterState) -> Self {
        let configs = state
            .configs
            .iter()
            .map(|(product, values)| ProductConfig::new(product).with_values(values.clone()));
        Self {
            config: Arc::new(InMemoryConfigStore::with_configs(configs)),
            resources: Arc::new(InMemoryResourceClient::with_objects(state.objects.clone())),
            secrets: Arc::new(InMemorySecretLookup::with_secrets(state.secrets.clone())),
            oauth: Arc::new(InMemoryOAuthRegistrar::with_clients(state.oauth_clients.clone())),
            directory: Arc::new(InMemoryDirectory::with_state(
                state.accounts.clone(),
                state.groups.clone(),
            )),
            namespaces: Arc::new(InMemoryNamespaces::with_namespaces(state.namespaces.clone())),
            subscriptions: Arc::new(InMemorySubscriptions::with_installed(
                state.subscriptions.clone(),
            )),
            templates: Arc::new(StaticTemplateRenderer::new(state.templates.clone())),
            monitoring: Arc::new(InMemoryMonitoring::with_targets(
                state.blackbox_targets.clone(),
            )),
            events: Arc::new(InMemoryEventRecorder::with_events(state.events.clone())),
            owners: Arc::new(OwnershipTable::from_objects(&state.objects)),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            config: self.config.clone(),
            resources: self.resources.clone(),
            secrets: self.secrets.clone(),
            oauth: self.oauth.clone(),
            directory: self.directory.clone(),
            namespaces: self.namespaces.clone(),
            subscriptions: self.subscriptions.clone(),
            templates: self.templates.clone(),
            monitoring: self.monitoring.clone(),
            events: self.events.clone(),
            owners: self.owners.clone(),
        }
    }

    /// Captures the collaborators' current contents. Installation and
    /// product status are not held here and are taken from the caller.
    pub async fn snapshot(
        &self,
        installation: Installation,
        product: ProductStatus,
    ) -> ClusterState {
        ClusterState {
            installation,
            product,
            configs: self
                .config
                .all()
                .await
                .into_iter()
                .map(|config| (config.product_name().to_string(), config.values().clone()))
                .collect(),
            objects: self.resources.objects().await,
            secrets: self.secrets.all().await,
            oauth_clients: self.oauth.all().await,
            accounts: self.directory.accounts().await,
            groups: self.directory.groups().await,
            namespaces: self.namespaces.all().await,
            subscriptions: self.subscriptions.installed().await,
            templates: self.templates.templates().clone(),
            blackbox_targets: self.monitoring.targets().await,
            events: self.events.events(),
            last_reconciled_at: None,
        }
    }
}

pub async fn load_state(path: &Path) -> Result<ClusterState> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

pub async fn save_state(path: &Path, state: &ClusterState) -> Result<()> {
    let payload = serde_json::to_string_pretty(state).context("serialize cluster state")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create {}", parent.display()))?;
    }
    tokio::fs::write(path, payload)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    debug!(path = %path.display(), "cluster state saved");
    Ok(())
}
