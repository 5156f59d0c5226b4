//! Explicit owner → owned-object relation used for installation teardown.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use tracing::{debug, info};

use crate::error::ClientError;
use crate::resource::{Object, ObjectKey, ResourceClient};

/// Records which objects each installation owns so teardown does not depend
/// on garbage collection by the hosting platform.
#[derive(Debug, Default)]
pub struct OwnershipTable {
    owned: RwLock<BTreeMap<String, BTreeSet<ObjectKey>>>,
}

impl OwnershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the table from the owner stamped on stored objects.
    pub fn from_objects<'a>(objects: impl IntoIterator<Item = &'a Object>) -> Self {
        let table = Self::default();
        for object in objects {
            if let Some(owner) = object.metadata.owner.as_deref() {
                table.record(owner, object.key());
            }
        }
        table
    }

    pub fn record(&self, owner: &str, key: ObjectKey) {
        self.owned
            .write()
            .expect("ownership lock poisoned")
            .entry(owner.to_string())
            .or_default()
            .insert(key);
    }

    pub fn owned(&self, owner: &str) -> Vec<ObjectKey> {
        self.owned
            .read()
            .expect("ownership lock poisoned")
            .get(owner)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn forget(&self, owner: &str, key: &ObjectKey) {
        let mut owned = self.owned.write().expect("ownership lock poisoned");
        if let Some(keys) = owned.get_mut(owner) {
            keys.remove(key);
            if keys.is_empty() {
                owned.remove(owner);
            }
        }
    }

    /// Deletes every object owned by `owner`. Objects that are already gone
    /// count as removed. Stops at the first backend error, leaving the
    /// remaining entries in place for the next attempt.
    pub async fn teardown(
        &self,
        owner: &str,
        client: &dyn ResourceClient,
    ) -> Result<usize, ClientError> {
        let keys = self.owned(owner);
        let mut removed = 0;
        for key in keys.iter().rev() {
            let existed = client.delete(key).await?;
            debug!(resource = %key, existed, "deleted owned resource");
            self.forget(owner, key);
            removed += 1;
        }
        if removed > 0 {
            info!(owner, removed, "owned resources torn down");
        }
        Ok(removed)
    }
}
