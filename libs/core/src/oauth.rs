use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantMethod {
    Auto,
    #[default]
    Prompt,
}

/// Platform OAuth client the realm's platform identity provider logs in through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClient {
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub grant_method: GrantMethod,
}

#[async_trait]
pub trait OAuthClientRegistrar: Send + Sync {
    /// Creates or overwrites the client and returns the registered form.
    async fn reconcile(&self, client: &OAuthClient) -> Result<OAuthClient>;
    /// Removing an absent client succeeds.
    async fn remove(&self, name: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryOAuthRegistrar {
    clients: RwLock<BTreeMap<String, OAuthClient>>,
}

impl InMemoryOAuthRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: impl IntoIterator<Item = OAuthClient>) -> Self {
        Self {
            clients: RwLock::new(clients.into_iter().map(|c| (c.name.clone(), c)).collect()),
        }
    }

    pub async fn get(&self, name: &str) -> Option<OAuthClient> {
        self.clients.read().await.get(name).cloned()
    }

    pub async fn all(&self) -> Vec<OAuthClient> {
        self.clients.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl OAuthClientRegistrar for InMemoryOAuthRegistrar {
    async fn reconcile(&self, client: &OAuthClient) -> Result<OAuthClient> {
        self.clients
            .write()
            .await
            .insert(client.name.clone(), client.clone());
        Ok(client.clone())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.clients.write().await.remove(name);
        Ok(())
    }
}
