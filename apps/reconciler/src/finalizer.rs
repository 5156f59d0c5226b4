use anyhow::Context;
use sso_core::{Installation, ReconcileError, StageOutcome, StatusPhase};
use tracing::info;

use crate::reconciler::Reconciler;
use crate::settings::FINALIZER;

impl Reconciler {
    /// Keeps the product finalizer on a live installation. Once deletion is
    /// requested, removes the namespace, the OAuth client and every owned
    /// resource, then drops the finalizer.
    ///
    /// `Completed` on a deleted installation ends the pass.
    pub(crate) async fn reconcile_finalizer(
        &self,
        installation: &mut Installation,
    ) -> Result<StageOutcome, ReconcileError> {
        if !installation.deletion_requested {
            if installation.add_finalizer(FINALIZER) {
                info!(finalizer = FINALIZER, "finalizer added to installation");
            }
            return Ok(StageOutcome::Completed);
        }
        if !installation.has_finalizer(FINALIZER) {
            return Ok(StageOutcome::Completed);
        }

        let namespace = self.config.namespace();
        let phase = self
            .deps
            .namespaces
            .remove(namespace)
            .await
            .with_context(|| format!("failed to remove namespace {namespace}"))?;
        if phase != StatusPhase::Completed {
            return Ok(StageOutcome::from_phase(
                phase,
                format!("namespace {namespace} is still being removed"),
            ));
        }

        self.deps
            .oauth
            .remove(&self.oauth_client_name)
            .await
            .with_context(|| format!("failed to remove oauth client {}", self.oauth_client_name))?;

        let removed = self
            .deps
            .owners
            .teardown(installation.owner_id(), self.deps.resources.as_ref())
            .await?;

        installation.remove_finalizer(FINALIZER);
        info!(removed, namespace, "installation resources torn down");
        Ok(StageOutcome::Completed)
    }
}
