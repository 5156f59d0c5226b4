use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Looks up secret payloads by name and namespace.
#[async_trait]
pub trait SecretLookup: Send + Sync {
    /// `Ok(None)` means the secret does not exist (yet).
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<SecretData>>;
}

/// Reads `key` from secret data as UTF-8, replacing invalid sequences.
pub fn secret_string(data: &SecretData, key: &str) -> Option<String> {
    data.get(key)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSecret {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct InMemorySecretLookup {
    secrets: RwLock<HashMap<(String, String), SecretData>>,
}

impl InMemorySecretLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secrets(secrets: impl IntoIterator<Item = StoredSecret>) -> Self {
        let secrets = secrets
            .into_iter()
            .map(|s| {
                let data = s
                    .data
                    .into_iter()
                    .map(|(k, v)| (k, v.into_bytes()))
                    .collect();
                ((s.namespace, s.name), data)
            })
            .collect();
        Self {
            secrets: RwLock::new(secrets),
        }
    }

    pub async fn insert<I, K, V>(&self, name: &str, namespace: &str, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = data
            .into_iter()
            .map(|(k, v)| (k.into(), v.into().into_bytes()))
            .collect();
        self.secrets
            .write()
            .await
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub async fn remove(&self, name: &str, namespace: &str) {
        self.secrets
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub async fn all(&self) -> Vec<StoredSecret> {
        let mut out: Vec<_> = self
            .secrets
            .read()
            .await
            .iter()
            .map(|((namespace, name), data)| StoredSecret {
                name: name.clone(),
                namespace: namespace.clone(),
                data: data
                    .iter()
                    .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
                    .collect(),
            })
            .collect();
        out.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        out
    }
}

#[async_trait]
impl SecretLookup for InMemorySecretLookup {
    async fn get(&self, name: &str, namespace: &str) -> Result<Option<SecretData>> {
        Ok(self
            .secrets
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}
