use anyhow::anyhow;
use sso_core::{
    IdentityServer, Realm, RealmPhase, ReconcileError, Resource, StageOutcome, get_typed,
    secret_string,
};
use tracing::{debug, info};

use crate::reconciler::Reconciler;
use crate::settings::{ADMIN_URL_KEY, IDENTITY_SERVER_NAME, REALM_NAME};

impl Reconciler {
    /// Records the versions the identity server reports and waits for the
    /// realm to be accepted before exporting its endpoint.
    pub(crate) async fn handle_progress_phase(&mut self) -> Result<StageOutcome, ReconcileError> {
        let namespace = self.config.namespace().to_string();

        // an unreadable server only delays the version update
        let server = get_typed::<IdentityServer>(
            self.deps.resources.as_ref(),
            IDENTITY_SERVER_NAME,
            &namespace,
        )
        .await;
        match server {
            Ok(Some(server)) if server.status.version != self.config.product_version() => {
                info!(version = %server.status.version, "identity server version changed");
                self.config.set_product_version(server.status.version);
                self.persist_config().await?;
            }
            Ok(_) => {}
            Err(err) => debug!(error = %err, "identity server unavailable for version check"),
        }

        // the server operator does not report its own version
        if self.config.operator_version() != self.settings.operator_version {
            let version = self.settings.operator_version.clone();
            self.config.set_operator_version(version);
            self.persist_config().await?;
        }

        debug!("checking ready status for realm");
        let realm = get_typed::<Realm>(self.deps.resources.as_ref(), REALM_NAME, &namespace)
            .await
            .map_err(|err| ReconcileError::from(err).context("failed to get realm"))?
            .ok_or_else(|| ReconcileError::MissingResource {
                kind: Realm::KIND,
                name: REALM_NAME.to_string(),
                namespace: namespace.clone(),
            })?;

        if realm.status.phase != RealmPhase::Reconciling {
            info!(phase = %realm.status.phase, "realm not yet accepted by the identity server");
            return Ok(StageOutcome::in_progress(format!(
                "realm {REALM_NAME} is in phase {}",
                realm.status.phase
            )));
        }

        self.export_config()
            .await
            .map_err(|err| err.context("failed to write rhsso config"))?;
        info!("identity server has accepted the realm");
        Ok(StageOutcome::Completed)
    }

    /// Copies the realm name and the admin endpoint from the server's admin
    /// credential secret into product configuration.
    pub(crate) async fn export_config(&mut self) -> Result<(), ReconcileError> {
        let namespace = self.config.namespace().to_string();
        let server = get_typed::<IdentityServer>(
            self.deps.resources.as_ref(),
            IDENTITY_SERVER_NAME,
            &namespace,
        )
        .await?
        .ok_or_else(|| ReconcileError::MissingResource {
            kind: IdentityServer::KIND,
            name: IDENTITY_SERVER_NAME.to_string(),
            namespace: namespace.clone(),
        })?;

        let secret_name = server.spec.admin_credentials;
        if secret_name.is_empty() {
            return Err(anyhow!(
                "identity server {IDENTITY_SERVER_NAME} does not name an admin credential secret yet"
            )
            .into());
        }
        let data = self.require_secret(&secret_name, &namespace).await?;
        let host =
            secret_string(&data, ADMIN_URL_KEY).ok_or_else(|| ReconcileError::MissingSecretKey {
                name: secret_name.clone(),
                namespace: namespace.clone(),
                key: ADMIN_URL_KEY.to_string(),
            })?;

        if self.config.realm() == REALM_NAME && self.config.host() == host {
            return Ok(());
        }
        self.config.set_realm(REALM_NAME);
        self.config.set_host(host);
        self.persist_config().await
    }
}
