//! Identity server and realm convergence, including the realm's identity
//! providers and the directory user sync.
use std::collections::BTreeMap;

use anyhow::Context;
use metrics::counter;
use sso_core::{
    ConvergeError, ExternalAccess, GrantMethod, Group, IdentityProvider, IdentityServer,
    Installation, LabelSelector, OAuthClient, Realm, ReconcileError, RedirectorOverride,
    StageOutcome, SyncReport, create_or_update, customer_admin_user, ensure_user,
    merge_provider, secret_string, synchronize_users,
};
use tracing::{info, warn};

use crate::reconciler::Reconciler;
use crate::settings::{
    BROWSER_FLOW, FIRST_BROKER_LOGIN_FLOW, GITHUB_CLIENT_ID_KEY, GITHUB_CLIENT_SECRET_KEY,
    GITHUB_CREDENTIALS_SECRET, GITHUB_IDP_ALIAS, IDENTITY_SERVER_NAME, METRICS_EXTENSION,
    METRICS_LISTENER, PLATFORM_IDP_ALIAS, PRIVILEGED_GROUP, PRODUCT_NAME, REALM_NAME,
    SERVER_PROFILE, instance_labels,
};

const PLATFORM_SCOPE: &str = "user:full";
const GITHUB_SCOPE: &str =
    "repo,user,write:public_key,admin:repo_hook,read:org,public_repo,user:email";

impl Reconciler {
    pub(crate) async fn reconcile_components(
        &self,
        installation: &Installation,
    ) -> Result<StageOutcome, ReconcileError> {
        info!("reconciling identity server components");
        let owner = installation.owner_id();
        let namespace = self.config.namespace();
        let client = self.deps.resources.as_ref();
        let owners = self.deps.owners.as_ref();

        let (_, result) = create_or_update::<IdentityServer, _>(
            client,
            owners,
            IDENTITY_SERVER_NAME,
            namespace,
            |server| {
                server.metadata.ensure_owner(owner);
                server.metadata.labels = instance_labels();
                server.spec.extensions = vec![METRICS_EXTENSION.to_string()];
                server.spec.instances = 1;
                server.spec.external_access = ExternalAccess { enabled: true };
                server.spec.profile = SERVER_PROFILE.to_string();
                Ok(())
            },
        )
        .await
        .map_err(|err| convergence_failed(err, "failed to create/update identity server"))?;
        info!(resource = IDENTITY_SERVER_NAME, %result, "identity server converged");

        // Provider entries and directory state are gathered up front: the
        // realm mutator below is synchronous.
        let platform_idp = self
            .platform_provider()
            .await
            .map_err(|err| err.context("failed to setup openshift identity provider"))?;
        let github_idp = self
            .github_provider()
            .await
            .map_err(|err| err.context("failed to setup github identity provider"))?;
        let accounts = self
            .deps
            .directory
            .list_accounts()
            .await
            .context("failed to list directory accounts")?;
        let privileged = self
            .deps
            .directory
            .get_group(PRIVILEGED_GROUP)
            .await
            .with_context(|| format!("failed to read group {PRIVILEGED_GROUP}"))?
            .unwrap_or_else(|| Group {
                name: PRIVILEGED_GROUP.to_string(),
                users: Vec::new(),
            });
        let admin = customer_admin_user(&self.settings.customer_admin_password);

        let mut report = SyncReport::default();
        let (_, result) =
            create_or_update::<Realm, _>(client, owners, REALM_NAME, namespace, |realm| {
                realm.metadata.ensure_owner(owner);
                realm.metadata.labels = instance_labels();
                realm.spec.instance_selector = LabelSelector::new(instance_labels());
                realm.spec.realm_overrides = vec![RedirectorOverride {
                    identity_provider: PLATFORM_IDP_ALIAS.to_string(),
                    for_flow: BROWSER_FLOW.to_string(),
                }];

                let definition = &mut realm.spec.realm;
                definition.id = REALM_NAME.to_string();
                definition.realm = REALM_NAME.to_string();
                definition.display_name = REALM_NAME.to_string();
                definition.enabled = true;
                definition.events_listeners = vec![METRICS_LISTENER.to_string()];

                // providers cannot be changed once the realm exists
                for provider in [platform_idp, github_idp] {
                    let alias = provider.alias.clone();
                    if merge_provider(&mut definition.identity_providers, provider) {
                        info!(%alias, "adding identity provider to realm");
                    }
                }

                ensure_user(&mut definition.users, admin);
                report = synchronize_users(
                    &mut definition.users,
                    &accounts,
                    &privileged,
                    PLATFORM_IDP_ALIAS,
                );
                Ok(())
            })
            .await
            .map_err(|err| convergence_failed(err, "failed to create/update realm"))?;
        info!(resource = REALM_NAME, %result, "realm converged");

        record_sync(&report);
        Ok(StageOutcome::Completed)
    }

    /// Registers the platform OAuth client and builds the matching provider.
    async fn platform_provider(&self) -> Result<IdentityProvider, ReconcileError> {
        let secret_name = &self.settings.oauth_clients_secret;
        let operator_namespace = &self.settings.operator_namespace;
        let data = self.require_secret(secret_name, operator_namespace).await?;
        let client_secret =
            secret_string(&data, PRODUCT_NAME).ok_or_else(|| ReconcileError::MissingSecretKey {
                name: secret_name.clone(),
                namespace: operator_namespace.clone(),
                key: PRODUCT_NAME.to_string(),
            })?;

        let oauth_client = OAuthClient {
            name: self.oauth_client_name.clone(),
            secret: client_secret.clone(),
            redirect_uris: vec![format!(
                "{}/auth/realms/{REALM_NAME}/broker/{PLATFORM_IDP_ALIAS}/endpoint",
                self.config.host()
            )],
            grant_method: GrantMethod::Prompt,
        };
        self.deps
            .oauth
            .reconcile(&oauth_client)
            .await
            .with_context(|| format!("failed to reconcile oauth client {}", oauth_client.name))?;

        Ok(IdentityProvider {
            alias: PLATFORM_IDP_ALIAS.to_string(),
            provider_id: PLATFORM_IDP_ALIAS.to_string(),
            enabled: true,
            trust_email: true,
            store_token: true,
            add_read_token_role_on_create: true,
            link_only: false,
            first_broker_login_flow_alias: FIRST_BROKER_LOGIN_FLOW.to_string(),
            config: BTreeMap::from([
                ("hideOnLoginPage".to_string(), String::new()),
                ("baseUrl".to_string(), self.settings.api_url.clone()),
                ("clientId".to_string(), self.oauth_client_name.clone()),
                ("disableUserInfo".to_string(), String::new()),
                ("clientSecret".to_string(), client_secret),
                ("defaultScope".to_string(), PLATFORM_SCOPE.to_string()),
                ("useJwksUrl".to_string(), "true".to_string()),
            ]),
        })
    }

    /// Link-only source control login. Credentials are read on every pass but
    /// only take effect when the provider is first added.
    async fn github_provider(&self) -> Result<IdentityProvider, ReconcileError> {
        let operator_namespace = &self.settings.operator_namespace;
        let data = self
            .require_secret(GITHUB_CREDENTIALS_SECRET, operator_namespace)
            .await?;
        let field = |key: &str| {
            secret_string(&data, key).ok_or_else(|| ReconcileError::MissingSecretKey {
                name: GITHUB_CREDENTIALS_SECRET.to_string(),
                namespace: operator_namespace.clone(),
                key: key.to_string(),
            })
        };

        Ok(IdentityProvider {
            alias: GITHUB_IDP_ALIAS.to_string(),
            provider_id: GITHUB_IDP_ALIAS.to_string(),
            enabled: true,
            trust_email: false,
            store_token: true,
            add_read_token_role_on_create: true,
            link_only: true,
            first_broker_login_flow_alias: FIRST_BROKER_LOGIN_FLOW.to_string(),
            config: BTreeMap::from([
                ("hideOnLoginPage".to_string(), "true".to_string()),
                ("clientId".to_string(), field(GITHUB_CLIENT_ID_KEY)?),
                ("disableUserInfo".to_string(), String::new()),
                ("clientSecret".to_string(), field(GITHUB_CLIENT_SECRET_KEY)?),
                ("defaultScope".to_string(), GITHUB_SCOPE.to_string()),
                ("useJwksUrl".to_string(), "true".to_string()),
            ]),
        })
    }
}

fn convergence_failed(err: ConvergeError, context: &str) -> ReconcileError {
    warn!(
        resource = %err.key(),
        operation = %err.operation(),
        "resource convergence failed"
    );
    ReconcileError::from(err).context(context)
}

fn record_sync(report: &SyncReport) {
    counter!("sso_directory_sync_total", "kind" => "added").increment(report.added.len() as u64);
    counter!("sso_directory_sync_total", "kind" => "removed")
        .increment(report.removed.len() as u64);
    if !report.is_empty() {
        info!(
            added = ?report.added,
            removed = ?report.removed,
            roles_changed = ?report.roles_changed,
            "realm users synchronized with directory"
        );
    }
}
