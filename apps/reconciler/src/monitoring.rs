use std::collections::BTreeMap;

use anyhow::Context;
use sso_core::{
    BlackboxTarget, Installation, ReconcileError, StageOutcome, TEMPLATE_MONITORING_KEY_PARAM,
    TEMPLATE_NAMESPACE_PARAM,
};
use tracing::{debug, info};

use crate::reconciler::Reconciler;
use crate::settings::{BLACKBOX_SERVICE, BLACKBOX_TARGET_NAME, MONITORING_PRODUCT_NAME};

impl Reconciler {
    pub(crate) async fn reconcile_templates(
        &self,
        installation: &Installation,
    ) -> Result<StageOutcome, ReconcileError> {
        let params = BTreeMap::from([
            (
                TEMPLATE_MONITORING_KEY_PARAM.to_string(),
                self.config.label_selector().to_string(),
            ),
            (
                TEMPLATE_NAMESPACE_PARAM.to_string(),
                self.config.namespace().to_string(),
            ),
        ]);

        for template in self.config.template_list() {
            self.create_from_template(&template, &params, installation.owner_id())
                .await
                .map_err(|err| {
                    err.context(format!("failed to create/update monitoring template {template}"))
                })?;
            info!(%template, "monitoring template reconciled");
        }
        Ok(StageOutcome::Completed)
    }

    /// Creates the rendered object once; an existing object is left alone.
    async fn create_from_template(
        &self,
        template: &str,
        params: &BTreeMap<String, String>,
        owner: &str,
    ) -> Result<(), ReconcileError> {
        let mut object = self.deps.templates.render(template, params).await?;
        object.metadata.ensure_owner(owner);
        let key = object.key();
        match self.deps.resources.create(object).await {
            Ok(_) => debug!(resource = %key, "monitoring resource created"),
            Err(err) if err.is_already_exists() => {
                debug!(resource = %key, "monitoring resource already exists")
            }
            Err(err) => return Err(err.into()),
        }
        self.deps.owners.record(owner, key);
        Ok(())
    }

    pub(crate) async fn reconcile_blackbox_targets(&self) -> Result<StageOutcome, ReconcileError> {
        let monitoring = self
            .deps
            .config
            .read(MONITORING_PRODUCT_NAME)
            .await
            .map_err(|err| ReconcileError::from(err).context("error reading monitoring config"))?;

        let target = BlackboxTarget {
            url: self.config.host().to_string(),
            service: BLACKBOX_SERVICE.to_string(),
        };
        self.deps
            .monitoring
            .register_blackbox_target(BLACKBOX_TARGET_NAME, &target, &monitoring)
            .await
            .context("error creating rhsso blackbox target")?;
        Ok(StageOutcome::Completed)
    }
}
