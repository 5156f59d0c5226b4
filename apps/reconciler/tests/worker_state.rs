use std::collections::BTreeMap;

use sso_core::{
    ConfigStore, ExternalAccount, FileConfigStore, Group, Installation, StatusPhase, StoredSecret,
};
use sso_reconciler::{
    ClusterState, ReconcilerSettings, load_state, preview_diff, run_once, run_pass, save_state,
};

fn seeded_state() -> ClusterState {
    ClusterState {
        installation: Installation::new("integreatly", "redhat-"),
        secrets: vec![
            StoredSecret {
                name: "oauth-client-secrets".into(),
                namespace: "integreatly-operator".into(),
                data: BTreeMap::from([("rhsso".into(), "platform-secret".into())]),
            },
            StoredSecret {
                name: "github-oauth-secret".into(),
                namespace: "integreatly-operator".into(),
                data: BTreeMap::from([
                    ("clientId".into(), "gh-id".into()),
                    ("secret".into(), "gh-secret".into()),
                ]),
            },
        ],
        accounts: vec![ExternalAccount::new("alice", "uid-alice")],
        groups: vec![Group {
            name: "dedicated-admins".into(),
            users: vec!["alice".into()],
        }],
        ..ClusterState::default()
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn single_pass_persists_cluster_state() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("state").join("cluster.json");
    save_state(&path, &seeded_state()).await.expect("seed state");

    let summary = run_once(&path, &ReconcilerSettings::default())
        .await
        .expect("pass");

    assert_eq!(summary.phase, StatusPhase::InProgress);
    assert!(summary.detail.as_deref().unwrap_or_default().contains("openshift"));

    let state = load_state(&path).await.expect("reload");
    assert_eq!(state.product.name, "rhsso");
    assert_eq!(state.product.phase, Some(StatusPhase::InProgress));
    assert!(state.installation.has_finalizer("finalizer.rhsso.integreatly.org"));
    assert_eq!(state.objects.len(), 2);
    assert_eq!(state.oauth_clients.len(), 1);
    assert_eq!(state.configs["rhsso"]["NAMESPACE"], "redhat-rhsso");
    assert!(state.last_reconciled_at.is_some());
    let users = state.realm_users().expect("decode realm").expect("realm");
    assert!(users.iter().any(|u| u.username == "alice"));

    assert!(logs_contain("realm converged"));
}

#[tokio::test]
async fn diff_preview_reflects_directory_changes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cluster.json");
    save_state(&path, &seeded_state()).await.expect("seed state");

    let preview = preview_diff(&path).await.expect("preview");
    assert_eq!(preview.added, vec!["alice"]);
    assert!(preview.removed.is_empty());

    run_once(&path, &ReconcilerSettings::default())
        .await
        .expect("pass");
    let mut state = load_state(&path).await.expect("reload");
    state.accounts = vec![ExternalAccount::new("bob", "uid-bob")];
    save_state(&path, &state).await.expect("save");

    let preview = preview_diff(&path).await.expect("preview");
    assert_eq!(preview.added, vec!["bob"]);
    assert_eq!(preview.removed, vec!["alice"]);
}

#[tokio::test]
async fn missing_state_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = run_once(&dir.path().join("absent.json"), &ReconcilerSettings::default())
        .await
        .expect_err("no state");
    assert!(err.to_string().starts_with("read "));
}

#[tokio::test]
async fn product_config_file_replaces_state_configs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let state_path = dir.path().join("cluster.json");
    let config_path = dir.path().join("config").join("products.json");
    save_state(&state_path, &seeded_state()).await.expect("seed state");

    let summary = run_pass(&state_path, Some(&config_path), &ReconcilerSettings::default())
        .await
        .expect("pass");
    assert_eq!(summary.phase, StatusPhase::InProgress);

    let rhsso = FileConfigStore::new(&config_path)
        .read("rhsso")
        .await
        .expect("read config file");
    assert_eq!(rhsso.namespace(), "redhat-rhsso");
    assert_eq!(rhsso.operator_version(), "1.9.2");

    let state = load_state(&state_path).await.expect("reload");
    assert!(state.configs.is_empty());
    assert_eq!(state.objects.len(), 2);
}
