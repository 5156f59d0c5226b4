//! Generic named resources and the client contract used to persist them.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::ClientError;

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl ObjectKey {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: Labels,
    /// Installation that owns this object; teardown deletes everything it owns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl ObjectMeta {
    pub fn ensure_owner(&mut self, owner: &str) {
        if self.owner.as_deref() != Some(owner) {
            self.owner = Some(owner.to_string());
        }
    }
}

/// Untyped stored form of any resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: Value,
    #[serde(default)]
    pub status: Value,
}

impl Object {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..ObjectMeta::default()
            },
            spec: Value::Null,
            status: Value::Null,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.kind, &self.metadata.name, &self.metadata.namespace)
    }

    pub fn encode<R: Resource>(resource: &R) -> Result<Self, ClientError> {
        let encode_err = |source| ClientError::Encode {
            kind: R::KIND,
            name: resource.meta().name.clone(),
            source,
        };
        let mut value = serde_json::to_value(resource).map_err(encode_err)?;
        if let Value::Object(map) = &mut value {
            map.insert("kind".into(), Value::String(R::KIND.to_string()));
        }
        serde_json::from_value(value).map_err(encode_err)
    }

    pub fn decode<R: Resource>(&self) -> Result<R, ClientError> {
        let decode_err = |source| ClientError::Decode {
            key: self.key(),
            source,
        };
        let mut value = serde_json::to_value(self).map_err(decode_err)?;
        if let Value::Object(map) = &mut value {
            // unset sections fall back to the typed defaults
            map.retain(|_, section| !section.is_null());
        }
        serde_json::from_value(value).map_err(decode_err)
    }
}

/// A typed resource with a fixed kind and standard metadata.
pub trait Resource: Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + Sync {
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        ObjectKey::new(Self::KIND, &self.meta().name, &self.meta().namespace)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: Labels,
}

impl LabelSelector {
    pub fn new(match_labels: Labels) -> Self {
        Self { match_labels }
    }

    /// An empty selector matches everything.
    pub fn matches(&self, labels: &Labels) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Object>, ClientError>;
    async fn create(&self, object: Object) -> Result<Object, ClientError>;
    /// Replaces metadata and spec. Status is owned by the backend and kept.
    async fn update(&self, object: Object) -> Result<Object, ClientError>;
    /// Returns `false` when the object was already absent.
    async fn delete(&self, key: &ObjectKey) -> Result<bool, ClientError>;
    async fn list(&self, kind: &str, selector: &LabelSelector) -> Result<Vec<Object>, ClientError>;
}

/// Reads a typed resource, mapping absence to `None`.
pub async fn get_typed<R: Resource>(
    client: &dyn ResourceClient,
    name: &str,
    namespace: &str,
) -> Result<Option<R>, ClientError> {
    let key = ObjectKey::new(R::KIND, name, namespace);
    client
        .get(&key)
        .await?
        .map(|object| object.decode())
        .transpose()
}

/// Map-backed client used by tests and the local harness.
#[derive(Default)]
pub struct InMemoryResourceClient {
    objects: RwLock<BTreeMap<ObjectKey, Object>>,
    failing_kinds: RwLock<BTreeSet<String>>,
    writes: AtomicUsize,
}

impl InMemoryResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: impl IntoIterator<Item = Object>) -> Self {
        let objects = objects.into_iter().map(|o| (o.key(), o)).collect();
        Self {
            objects: RwLock::new(objects),
            ..Self::default()
        }
    }

    pub async fn insert(&self, object: Object) {
        self.objects.write().await.insert(object.key(), object);
    }

    /// Overwrites the backend-owned status of a stored object.
    pub async fn set_status(&self, key: &ObjectKey, status: Value) -> Result<(), ClientError> {
        let mut objects = self.objects.write().await;
        let object = objects
            .get_mut(key)
            .ok_or_else(|| ClientError::NotFound(key.clone()))?;
        object.status = status;
        Ok(())
    }

    /// Makes every create/update of `kind` fail with a backend error.
    pub async fn fail_writes_for(&self, kind: &str) {
        self.failing_kinds.write().await.insert(kind.to_string());
    }

    pub async fn objects(&self) -> Vec<Object> {
        self.objects.read().await.values().cloned().collect()
    }

    /// Number of successful create, update and delete calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn check_writable(&self, key: &ObjectKey) -> Result<(), ClientError> {
        if self.failing_kinds.read().await.contains(&key.kind) {
            return Err(ClientError::Backend(format!("writes to {} are rejected", key.kind)));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Object>, ClientError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn create(&self, object: Object) -> Result<Object, ClientError> {
        let key = object.key();
        self.check_writable(&key).await?;
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(ClientError::AlreadyExists(key));
        }
        objects.insert(key, object.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(object)
    }

    async fn update(&self, object: Object) -> Result<Object, ClientError> {
        let key = object.key();
        self.check_writable(&key).await?;
        let mut objects = self.objects.write().await;
        let stored = objects
            .get_mut(&key)
            .ok_or_else(|| ClientError::NotFound(key.clone()))?;
        stored.metadata = object.metadata;
        stored.spec = object.spec;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored.clone())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, ClientError> {
        let removed = self.objects.write().await.remove(key).is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    async fn list(&self, kind: &str, selector: &LabelSelector) -> Result<Vec<Object>, ClientError> {
        Ok(self
            .objects
            .read()
            .await
            .values()
            .filter(|o| o.kind == kind && selector.matches(&o.metadata.labels))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_requires_every_label() {
        let selector = LabelSelector::new(Labels::from([("sso".into(), "integreatly".into())]));
        assert!(selector.matches(&Labels::from([
            ("sso".into(), "integreatly".into()),
            ("team".into(), "a".into()),
        ])));
        assert!(!selector.matches(&Labels::from([("sso".into(), "other".into())])));
        assert!(LabelSelector::default().matches(&Labels::new()));
    }

    #[tokio::test]
    async fn update_keeps_backend_status() {
        let client = InMemoryResourceClient::new();
        let mut object = Object::new("Realm", "openshift", "rhsso");
        client.create(object.clone()).await.unwrap();
        client
            .set_status(&object.key(), serde_json::json!({"phase": "reconciling"}))
            .await
            .unwrap();

        object.spec = serde_json::json!({"enabled": true});
        let updated = client.update(object).await.unwrap();
        assert_eq!(updated.status["phase"], "reconciling");
        assert_eq!(updated.spec["enabled"], true);
        assert_eq!(client.write_count(), 2);
    }
}
