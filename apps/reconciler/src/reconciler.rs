use std::sync::Arc;

use metrics::counter;
use sso_core::{
    ConfigStore, DirectoryLookup, EventRecorder, Installation, MonitoringRegistrar,
    NamespaceManager, OAuthClientRegistrar, OwnershipTable, ProductConfig, ProductStatus,
    ReconcileError, ResourceClient, SecretData, SecretLookup, StageOutcome, StatusEvent,
    StatusPhase, SubscriptionManager, SubscriptionTarget, TemplateRenderer,
};
use tracing::{debug, info, instrument};

use crate::settings::{
    AUTHENTICATION_STAGE, DEFAULT_NAMESPACE_SUFFIX, MANIFEST_PACKAGE, PRODUCT_NAME,
    ReconcilerSettings, SUBSCRIPTION_CHANNEL, SUBSCRIPTION_PACKAGE,
};

/// Everything the loop talks to outside its own process.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<dyn ConfigStore>,
    pub resources: Arc<dyn ResourceClient>,
    pub secrets: Arc<dyn SecretLookup>,
    pub oauth: Arc<dyn OAuthClientRegistrar>,
    pub directory: Arc<dyn DirectoryLookup>,
    pub namespaces: Arc<dyn NamespaceManager>,
    pub subscriptions: Arc<dyn SubscriptionManager>,
    pub templates: Arc<dyn TemplateRenderer>,
    pub monitoring: Arc<dyn MonitoringRegistrar>,
    pub events: Arc<dyn EventRecorder>,
    pub owners: Arc<OwnershipTable>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Finalizer,
    Namespace,
    Subscription,
    Components,
    Progress,
    Templates,
    BlackboxTargets,
}

impl Stage {
    /// Execution order of one reconciliation pass.
    pub const PIPELINE: [Stage; 7] = [
        Stage::Finalizer,
        Stage::Namespace,
        Stage::Subscription,
        Stage::Components,
        Stage::Progress,
        Stage::Templates,
        Stage::BlackboxTargets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Finalizer => "finalizer",
            Stage::Namespace => "namespace",
            Stage::Subscription => "subscription",
            Stage::Components => "components",
            Stage::Progress => "progress",
            Stage::Templates => "templates",
            Stage::BlackboxTargets => "blackbox_targets",
        }
    }

    pub fn failure_message(&self, namespace: &str) -> String {
        match self {
            Stage::Finalizer => "Failed to reconcile finalizer".to_string(),
            Stage::Namespace => format!("Failed to reconcile {namespace} namespace"),
            Stage::Subscription => {
                format!("Failed to reconcile {SUBSCRIPTION_PACKAGE} subscription")
            }
            Stage::Components => "Failed to reconcile components".to_string(),
            Stage::Progress => "Failed to handle in progress phase".to_string(),
            Stage::Templates => "Failed to reconcile templates".to_string(),
            Stage::BlackboxTargets => "Failed to reconcile blackbox targets".to_string(),
        }
    }
}

/// Drives the identity server product of one installation towards its target
/// state. Build a fresh reconciler per pass so configuration is re-read.
pub struct Reconciler {
    pub(crate) config: ProductConfig,
    pub(crate) settings: ReconcilerSettings,
    pub(crate) deps: Collaborators,
    pub(crate) oauth_client_name: String,
}

impl Reconciler {
    pub async fn new(
        installation: &Installation,
        settings: ReconcilerSettings,
        deps: Collaborators,
    ) -> Result<Self, ReconcileError> {
        let mut config = deps.config.read(PRODUCT_NAME).await?;
        if config.namespace().is_empty() {
            config.set_namespace(format!(
                "{}{}",
                installation.namespace_prefix, DEFAULT_NAMESPACE_SUFFIX
            ));
        }
        Ok(Self {
            config,
            settings,
            deps,
            oauth_client_name: format!("{}{}", installation.namespace_prefix, PRODUCT_NAME),
        })
    }

    pub fn config(&self) -> &ProductConfig {
        &self.config
    }

    pub fn oauth_client_name(&self) -> &str {
        &self.oauth_client_name
    }

    /// Runs every stage in order and stops at the first one that does not
    /// complete. The returned phase is also written to `product.phase`.
    #[instrument(
        name = "rhsso.reconcile",
        skip_all,
        fields(installation = %installation.name, namespace = %self.config.namespace())
    )]
    pub async fn reconcile(
        &mut self,
        installation: &mut Installation,
        product: &mut ProductStatus,
    ) -> StageOutcome {
        for stage in Stage::PIPELINE {
            debug!(stage = stage.as_str(), "running stage");
            match StageOutcome::from(self.run_stage(stage, installation).await) {
                StageOutcome::Completed
                    if stage == Stage::Finalizer && installation.deletion_requested =>
                {
                    return finish(product, StageOutcome::Completed);
                }
                StageOutcome::Completed => {}
                StageOutcome::InProgress(reason) => {
                    info!(stage = stage.as_str(), %reason, "stage in progress");
                    return finish(product, StageOutcome::InProgress(reason));
                }
                StageOutcome::Failed(err) => {
                    let message = stage.failure_message(self.config.namespace());
                    self.deps.events.record(StatusEvent::processing_error(
                        installation.owner_id(),
                        &message,
                        &err,
                    ));
                    return finish(product, StageOutcome::Failed(err.context(message)));
                }
            }
        }

        self.project_status(installation, product);
        finish(product, StageOutcome::Completed)
    }

    async fn run_stage(
        &mut self,
        stage: Stage,
        installation: &mut Installation,
    ) -> Result<StageOutcome, ReconcileError> {
        match stage {
            Stage::Finalizer => self.reconcile_finalizer(installation).await,
            Stage::Namespace => self.reconcile_namespace(installation).await,
            Stage::Subscription => self.reconcile_subscription().await,
            Stage::Components => self.reconcile_components(installation).await,
            Stage::Progress => self.handle_progress_phase().await,
            Stage::Templates => self.reconcile_templates(installation).await,
            Stage::BlackboxTargets => self.reconcile_blackbox_targets().await,
        }
    }

    async fn reconcile_namespace(
        &self,
        installation: &Installation,
    ) -> Result<StageOutcome, ReconcileError> {
        let namespace = self.config.namespace();
        let phase = self
            .deps
            .namespaces
            .ensure(namespace, installation.owner_id())
            .await?;
        Ok(StageOutcome::from_phase(
            phase,
            format!("namespace {namespace} is not ready"),
        ))
    }

    async fn reconcile_subscription(&self) -> Result<StageOutcome, ReconcileError> {
        let target = SubscriptionTarget {
            package: SUBSCRIPTION_PACKAGE.to_string(),
            channel: SUBSCRIPTION_CHANNEL.to_string(),
            namespace: self.config.namespace().to_string(),
            manifest_package: MANIFEST_PACKAGE.to_string(),
        };
        let phase = self.deps.subscriptions.ensure(&target).await?;
        Ok(StageOutcome::from_phase(
            phase,
            format!("subscription {SUBSCRIPTION_PACKAGE} is not installed yet"),
        ))
    }

    fn project_status(&self, installation: &Installation, product: &mut ProductStatus) {
        product.host = self.config.host().to_string();
        product.version = self.config.product_version().to_string();
        product.operator_version = self.config.operator_version().to_string();

        if product.phase != Some(StatusPhase::Completed) {
            self.deps.events.record(StatusEvent::product_completed(
                installation.owner_id(),
                AUTHENTICATION_STAGE,
                PRODUCT_NAME,
            ));
        }
    }

    /// Fetches a secret that must exist.
    pub(crate) async fn require_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<SecretData, ReconcileError> {
        self.deps
            .secrets
            .get(name, namespace)
            .await?
            .ok_or_else(|| ReconcileError::MissingSecret {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    pub(crate) async fn persist_config(&self) -> Result<(), ReconcileError> {
        self.deps.config.write(&self.config).await?;
        debug!(product = PRODUCT_NAME, "product config written");
        Ok(())
    }
}

fn finish(product: &mut ProductStatus, outcome: StageOutcome) -> StageOutcome {
    counter!("sso_reconcile_total", "phase" => outcome.phase().as_str()).increment(1);
    product.phase = Some(outcome.phase());
    outcome
}
