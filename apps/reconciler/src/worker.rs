use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use sso_core::{FileConfigStore, StageOutcome, StatusPhase, diff_users};
use time::OffsetDateTime;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::harness::{LocalCluster, load_state, save_state};
use crate::reconciler::Reconciler;
use crate::settings::{PRODUCT_NAME, ReconcilerSettings, WorkerConfig};

/// Result of one reconciliation pass over the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub phase: StatusPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PassSummary {
    fn from_outcome(outcome: &StageOutcome) -> Self {
        let detail = match outcome {
            StageOutcome::Completed => None,
            StageOutcome::InProgress(reason) => Some(reason.clone()),
            StageOutcome::Failed(err) => Some(err.to_string()),
        };
        Self {
            phase: outcome.phase(),
            detail,
        }
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.phase),
            None => write!(f, "{}", self.phase),
        }
    }
}

/// Loads the state file, runs one pass and writes the resulting state back.
pub async fn run_once(state_path: &Path, settings: &ReconcilerSettings) -> Result<PassSummary> {
    run_pass(state_path, None, settings).await
}

/// Like [`run_once`], but product configuration is read from and written to
/// `config_path` when one is given.
pub async fn run_pass(
    state_path: &Path,
    config_path: Option<&Path>,
    settings: &ReconcilerSettings,
) -> Result<PassSummary> {
    let state = load_state(state_path).await?;
    let cluster = LocalCluster::from_state(&state);
    let mut installation = state.installation;
    let mut product = state.product;
    if product.name.is_empty() {
        product.name = PRODUCT_NAME.to_string();
    }

    let mut deps = cluster.collaborators();
    if let Some(path) = config_path {
        debug!(config = %path.display(), "using product config file");
        deps.config = Arc::new(FileConfigStore::new(path));
    }
    let mut reconciler = Reconciler::new(&installation, settings.clone(), deps)
        .await
        .context("failed to prepare reconciler")?;
    let outcome = reconciler.reconcile(&mut installation, &mut product).await;

    let mut next = cluster.snapshot(installation, product).await;
    let now = OffsetDateTime::now_utc();
    next.last_reconciled_at = Some(
        now.format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string()),
    );
    save_state(state_path, &next).await?;
    Ok(PassSummary::from_outcome(&outcome))
}

/// Runs a pass every `sync_interval`. Failed passes are logged and retried on
/// the next tick.
pub async fn run_worker(config: WorkerConfig, settings: ReconcilerSettings) -> Result<()> {
    let mut interval = pass_interval(config.sync_interval);
    info!(
        state = %config.state_path.display(),
        interval_secs = config.sync_interval.as_secs(),
        "sso reconciler worker started"
    );

    loop {
        interval.tick().await;
        match run_pass(&config.state_path, config.config_path.as_deref(), &settings).await {
            Ok(summary) => info!(
                phase = %summary.phase,
                detail = ?summary.detail,
                "reconcile pass finished"
            ),
            Err(err) => warn!(error = %format!("{err:#}"), "reconcile pass failed"),
        }
    }
}

/// A slow pass pushes the next one back instead of triggering catch-up passes.
fn pass_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// What the next pass would change in the realm's user list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffPreview {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

pub async fn preview_diff(state_path: &Path) -> Result<DiffPreview> {
    let state = load_state(state_path).await?;
    let users = state.realm_users()?.unwrap_or_default();
    let diff = diff_users(&users, &state.accounts);
    Ok(DiffPreview {
        added: diff.added.into_iter().map(|account| account.name).collect(),
        removed: diff
            .removed
            .into_iter()
            .filter_map(|index| users.get(index).map(|user| user.username.clone()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overrunning_passes_delay_the_schedule() {
        let interval = pass_interval(Duration::from_secs(30));
        assert_eq!(interval.missed_tick_behavior(), MissedTickBehavior::Delay);
        assert_eq!(interval.period(), Duration::from_secs(30));
    }
}
