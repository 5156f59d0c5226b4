//! Namespace and operator-subscription collaborators.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::phase::StatusPhase;

#[async_trait]
pub trait NamespaceManager: Send + Sync {
    /// Creates the namespace if needed; `InProgress` until it is usable.
    async fn ensure(&self, namespace: &str, owner: &str) -> Result<StatusPhase>;
    /// `InProgress` while deletion is still running.
    async fn remove(&self, namespace: &str) -> Result<StatusPhase>;
}

/// Operator package to install into a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTarget {
    pub package: String,
    pub channel: String,
    pub namespace: String,
    pub manifest_package: String,
}

#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    /// `InProgress` until the package's catalog reports it installed.
    async fn ensure(&self, target: &SubscriptionTarget) -> Result<StatusPhase>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub ready: bool,
}

#[derive(Default)]
pub struct InMemoryNamespaces {
    namespaces: RwLock<BTreeMap<String, NamespaceRecord>>,
    pending: RwLock<BTreeSet<String>>,
    draining: RwLock<BTreeSet<String>>,
    ensure_calls: AtomicUsize,
}

impl InMemoryNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespaces(records: impl IntoIterator<Item = NamespaceRecord>) -> Self {
        Self {
            namespaces: RwLock::new(records.into_iter().map(|r| (r.name.clone(), r)).collect()),
            ..Self::default()
        }
    }

    /// Keeps `namespace` reporting `InProgress` until [`Self::set_ready`].
    pub async fn hold_pending(&self, namespace: &str) {
        self.pending.write().await.insert(namespace.to_string());
        if let Some(record) = self.namespaces.write().await.get_mut(namespace) {
            record.ready = false;
        }
    }

    pub async fn set_ready(&self, namespace: &str) {
        self.pending.write().await.remove(namespace);
        if let Some(record) = self.namespaces.write().await.get_mut(namespace) {
            record.ready = true;
        }
    }

    /// Keeps removal of `namespace` reporting `InProgress` until
    /// [`Self::finish_removal`].
    pub async fn hold_removal(&self, namespace: &str) {
        self.draining.write().await.insert(namespace.to_string());
    }

    pub async fn finish_removal(&self, namespace: &str) {
        self.draining.write().await.remove(namespace);
    }

    pub async fn exists(&self, namespace: &str) -> bool {
        self.namespaces.read().await.contains_key(namespace)
    }

    pub async fn all(&self) -> Vec<NamespaceRecord> {
        self.namespaces.read().await.values().cloned().collect()
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NamespaceManager for InMemoryNamespaces {
    async fn ensure(&self, namespace: &str, owner: &str) -> Result<StatusPhase> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.pending.read().await.contains(namespace);
        let mut namespaces = self.namespaces.write().await;
        let record = namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| NamespaceRecord {
                name: namespace.to_string(),
                owner: Some(owner.to_string()),
                ready: !pending,
            });
        Ok(if record.ready {
            StatusPhase::Completed
        } else {
            StatusPhase::InProgress
        })
    }

    async fn remove(&self, namespace: &str) -> Result<StatusPhase> {
        if self.draining.read().await.contains(namespace) {
            return Ok(StatusPhase::InProgress);
        }
        self.namespaces.write().await.remove(namespace);
        Ok(StatusPhase::Completed)
    }
}

pub struct InMemorySubscriptions {
    installed: RwLock<BTreeMap<String, SubscriptionTarget>>,
    catalog_ready: AtomicBool,
    ensure_calls: AtomicUsize,
}

impl Default for InMemorySubscriptions {
    fn default() -> Self {
        Self {
            installed: RwLock::new(BTreeMap::new()),
            catalog_ready: AtomicBool::new(true),
            ensure_calls: AtomicUsize::new(0),
        }
    }
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(targets: impl IntoIterator<Item = SubscriptionTarget>) -> Self {
        Self {
            installed: RwLock::new(targets.into_iter().map(|t| (t.package.clone(), t)).collect()),
            ..Self::default()
        }
    }

    pub fn set_catalog_ready(&self, ready: bool) {
        self.catalog_ready.store(ready, Ordering::SeqCst);
    }

    pub async fn installed(&self) -> Vec<SubscriptionTarget> {
        self.installed.read().await.values().cloned().collect()
    }

    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionManager for InMemorySubscriptions {
    async fn ensure(&self, target: &SubscriptionTarget) -> Result<StatusPhase> {
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        self.installed
            .write()
            .await
            .insert(target.package.clone(), target.clone());
        Ok(if self.catalog_ready.load(Ordering::SeqCst) {
            StatusPhase::Completed
        } else {
            StatusPhase::InProgress
        })
    }
}
