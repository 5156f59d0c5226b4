//! Unified create-or-update over typed resources.
use std::fmt;

use tracing::debug;

use crate::error::{ConvergeError, Operation};
use crate::ownership::OwnershipTable;
use crate::resource::{Object, ObjectKey, Resource, ResourceClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationResult::Created => "created",
            OperationResult::Updated => "updated",
            OperationResult::Unchanged => "unchanged",
        })
    }
}

/// Fetches `name` in `namespace` (or starts from `R::default()`), applies
/// `mutate`, then creates or updates the stored object. Nothing is written
/// when the mutator leaves an existing resource untouched.
///
/// Whatever owner the mutator stamps on the metadata is recorded in `owners`.
/// Errors carry the resource identity and the failing operation; there is no
/// retry here.
pub async fn create_or_update<R, F>(
    client: &dyn ResourceClient,
    owners: &OwnershipTable,
    name: &str,
    namespace: &str,
    mutate: F,
) -> Result<(R, OperationResult), ConvergeError>
where
    R: Resource,
    F: FnOnce(&mut R) -> anyhow::Result<()>,
{
    let key = ObjectKey::new(R::KIND, name, namespace);
    let client_err = |operation, source| ConvergeError::Client {
        operation,
        key: key.clone(),
        source,
    };

    let existing = client
        .get(&key)
        .await
        .map_err(|source| client_err(Operation::Get, source))?
        .map(|object| object.decode::<R>())
        .transpose()
        .map_err(|source| client_err(Operation::Get, source))?;

    let mut desired = existing.clone().unwrap_or_default();
    mutate(&mut desired).map_err(|source| ConvergeError::Mutate {
        key: key.clone(),
        source,
    })?;
    let meta = desired.meta_mut();
    meta.name = name.to_string();
    meta.namespace = namespace.to_string();

    let (stored, result) = match existing {
        Some(current) if current == desired => (current, OperationResult::Unchanged),
        Some(_) => {
            let object = Object::encode(&desired)
                .map_err(|source| client_err(Operation::Update, source))?;
            let stored = client
                .update(object)
                .await
                .map_err(|source| client_err(Operation::Update, source))?;
            (decode_stored(&stored, &key, Operation::Update)?, OperationResult::Updated)
        }
        None => {
            let object = Object::encode(&desired)
                .map_err(|source| client_err(Operation::Create, source))?;
            let stored = client
                .create(object)
                .await
                .map_err(|source| client_err(Operation::Create, source))?;
            (decode_stored(&stored, &key, Operation::Create)?, OperationResult::Created)
        }
    };

    if let Some(owner) = stored.meta().owner.as_deref() {
        owners.record(owner, key.clone());
    }
    debug!(resource = %key, %result, "converged resource");
    Ok((stored, result))
}

/// Decodes the object a write returned; failures are attributed to that write.
fn decode_stored<R: Resource>(
    object: &Object,
    key: &ObjectKey,
    operation: Operation,
) -> Result<R, ConvergeError> {
    object.decode().map_err(|source| ConvergeError::Client {
        operation,
        key: key.clone(),
        source,
    })
}
