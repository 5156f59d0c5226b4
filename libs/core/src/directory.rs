//! External user directory lookup.
use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::users::{ExternalAccount, Group};

/// Read-only view of the authoritative user directory. Every call returns a
/// point-in-time snapshot; changes after the read are picked up next poll.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<ExternalAccount>>;
    /// `Ok(None)` when the group does not exist.
    async fn get_group(&self, name: &str) -> Result<Option<Group>>;
}

#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<Vec<ExternalAccount>>,
    groups: RwLock<BTreeMap<String, Group>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(
        accounts: Vec<ExternalAccount>,
        groups: impl IntoIterator<Item = Group>,
    ) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            groups: RwLock::new(groups.into_iter().map(|g| (g.name.clone(), g)).collect()),
        }
    }

    pub async fn set_accounts(&self, accounts: Vec<ExternalAccount>) {
        *self.accounts.write().await = accounts;
    }

    pub async fn set_group(&self, group: Group) {
        self.groups.write().await.insert(group.name.clone(), group);
    }

    pub async fn accounts(&self) -> Vec<ExternalAccount> {
        self.accounts.read().await.clone()
    }

    pub async fn groups(&self) -> Vec<Group> {
        self.groups.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl DirectoryLookup for InMemoryDirectory {
    async fn list_accounts(&self) -> Result<Vec<ExternalAccount>> {
        Ok(self.accounts.read().await.clone())
    }

    async fn get_group(&self, name: &str) -> Result<Option<Group>> {
        Ok(self.groups.read().await.get(name).cloned())
    }
}
