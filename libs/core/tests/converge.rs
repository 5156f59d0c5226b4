use async_trait::async_trait;
use sso_core::{
    ClientError, ConvergeError, IdentityServer, InMemoryResourceClient, LabelSelector, Object,
    ObjectKey, Operation, OperationResult, OwnershipTable, Realm, Resource, ResourceClient,
    create_or_update, get_typed,
};

fn configure(server: &mut IdentityServer) -> anyhow::Result<()> {
    server.metadata.ensure_owner("integreatly");
    server.spec.instances = 1;
    server.spec.external_access.enabled = true;
    server.spec.profile = "RHSSO".into();
    Ok(())
}

#[tokio::test]
async fn creates_then_reports_unchanged() {
    let client = InMemoryResourceClient::new();
    let owners = OwnershipTable::new();

    let (server, result) =
        create_or_update::<IdentityServer, _>(&client, &owners, "rhsso", "redhat-rhsso", configure)
            .await
            .expect("create");
    assert_eq!(result, OperationResult::Created);
    assert_eq!(server.metadata.name, "rhsso");
    assert_eq!(server.metadata.namespace, "redhat-rhsso");

    let (_, result) =
        create_or_update::<IdentityServer, _>(&client, &owners, "rhsso", "redhat-rhsso", configure)
            .await
            .expect("second pass");
    assert_eq!(result, OperationResult::Unchanged);
    assert_eq!(client.write_count(), 1);
    assert_eq!(owners.owned("integreatly"), vec![server.key()]);
}

#[tokio::test]
async fn update_overwrites_desired_fields_and_keeps_status() {
    let client = InMemoryResourceClient::new();
    let owners = OwnershipTable::new();
    create_or_update::<IdentityServer, _>(&client, &owners, "rhsso", "ns", configure)
        .await
        .expect("create");
    let key = ObjectKey::new(IdentityServer::KIND, "rhsso", "ns");
    client
        .set_status(&key, serde_json::json!({"version": "7.4", "phase": "reconciled"}))
        .await
        .expect("status");

    let (server, result) =
        create_or_update::<IdentityServer, _>(&client, &owners, "rhsso", "ns", |s| {
            configure(s)?;
            s.spec.instances = 3;
            Ok(())
        })
        .await
        .expect("update");

    assert_eq!(result, OperationResult::Updated);
    assert_eq!(server.spec.instances, 3);
    assert_eq!(server.status.version, "7.4");
    let stored: IdentityServer = get_typed(&client, "rhsso", "ns").await.unwrap().unwrap();
    assert_eq!(stored, server);
}

#[tokio::test]
async fn persistence_errors_name_resource_and_operation() {
    let client = InMemoryResourceClient::new();
    client.fail_writes_for(Realm::KIND).await;
    let owners = OwnershipTable::new();

    let err = create_or_update::<Realm, _>(&client, &owners, "openshift", "ns", |_| Ok(()))
        .await
        .expect_err("create must fail");

    assert_eq!(err.operation(), Operation::Create);
    assert_eq!(err.key().name, "openshift");
    assert!(err.to_string().starts_with("failed to create Realm ns/openshift"));
    assert!(client.list(Realm::KIND, &Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn mutator_errors_abort_before_any_write() {
    let client = InMemoryResourceClient::new();
    let owners = OwnershipTable::new();

    let err = create_or_update::<Realm, _>(&client, &owners, "openshift", "ns", |_| {
        anyhow::bail!("secret missing")
    })
    .await
    .expect_err("mutator fails");

    assert!(matches!(err, ConvergeError::Mutate { .. }));
    assert_eq!(client.write_count(), 0);
}

/// Hands back a stored object whose spec no longer matches its kind.
struct CorruptingClient(InMemoryResourceClient);

#[async_trait]
impl ResourceClient for CorruptingClient {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Object>, ClientError> {
        self.0.get(key).await
    }

    async fn create(&self, object: Object) -> Result<Object, ClientError> {
        let mut stored = self.0.create(object).await?;
        stored.spec = serde_json::json!("corrupted");
        Ok(stored)
    }

    async fn update(&self, object: Object) -> Result<Object, ClientError> {
        self.0.update(object).await
    }

    async fn delete(&self, key: &ObjectKey) -> Result<bool, ClientError> {
        self.0.delete(key).await
    }

    async fn list(&self, kind: &str, selector: &LabelSelector) -> Result<Vec<Object>, ClientError> {
        self.0.list(kind, selector).await
    }
}

#[tokio::test]
async fn unreadable_write_result_names_the_write() {
    let client = CorruptingClient(InMemoryResourceClient::new());
    let owners = OwnershipTable::new();

    let err = create_or_update::<IdentityServer, _>(&client, &owners, "rhsso", "ns", configure)
        .await
        .expect_err("decode fails");

    assert_eq!(err.operation(), Operation::Create);
    assert_eq!(err.key(), &ObjectKey::new(IdentityServer::KIND, "rhsso", "ns"));
    assert!(err.to_string().starts_with("failed to create IdentityServer ns/rhsso"));
    assert!(owners.owned("integreatly").is_empty());
}
