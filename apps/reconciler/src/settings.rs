use std::env;
use std::path::PathBuf;
use std::time::Duration;

use sso_core::Labels;
use thiserror::Error;

pub const PRODUCT_NAME: &str = "rhsso";
pub const MONITORING_PRODUCT_NAME: &str = "monitoring";
pub const AUTHENTICATION_STAGE: &str = "authentication";

pub const DEFAULT_NAMESPACE_SUFFIX: &str = "rhsso";
pub const IDENTITY_SERVER_NAME: &str = "rhsso";
pub const REALM_NAME: &str = "openshift";
pub const FINALIZER: &str = "finalizer.rhsso.integreatly.org";

pub const SUBSCRIPTION_PACKAGE: &str = "integreatly-rhsso";
pub const SUBSCRIPTION_CHANNEL: &str = "integreatly";
pub const MANIFEST_PACKAGE: &str = "integreatly-rhsso";

pub const SERVER_PROFILE: &str = "RHSSO";
pub const METRICS_EXTENSION: &str =
    "https://github.com/aerogear/keycloak-metrics-spi/releases/download/1.0.4/keycloak-metrics-spi-1.0.4.jar";
pub const METRICS_LISTENER: &str = "metrics-listener";

pub const PLATFORM_IDP_ALIAS: &str = "openshift-v4";
pub const GITHUB_IDP_ALIAS: &str = "github";
pub const GITHUB_CREDENTIALS_SECRET: &str = "github-oauth-secret";
pub const GITHUB_CLIENT_ID_KEY: &str = "clientId";
pub const GITHUB_CLIENT_SECRET_KEY: &str = "secret";
pub const FIRST_BROKER_LOGIN_FLOW: &str = "first broker login";
pub const BROWSER_FLOW: &str = "browser";

pub const PRIVILEGED_GROUP: &str = "dedicated-admins";
pub const ADMIN_URL_KEY: &str = "SSO_ADMIN_URL";

pub const BLACKBOX_TARGET_NAME: &str = "integreatly-rhsso";
pub const BLACKBOX_SERVICE: &str = "rhsso-ui";

const DEFAULT_OPERATOR_NAMESPACE: &str = "integreatly-operator";
const DEFAULT_OAUTH_CLIENTS_SECRET: &str = "oauth-client-secrets";
const DEFAULT_API_URL: &str = "https://kubernetes.default.svc";
const DEFAULT_OPERATOR_VERSION: &str = "1.9.2";
const DEFAULT_CUSTOMER_ADMIN_PASSWORD: &str = "Password1";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_STATE_PATH: &str = "sso-state.json";

/// Labels linking the realm to its identity server instance.
pub fn instance_labels() -> Labels {
    Labels::from([("sso".to_string(), "integreatly".to_string())])
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidInterval { var: &'static str, value: String },
}

/// Installation-wide values the reconciler needs besides product configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Namespace holding shared secrets such as the OAuth client secrets.
    pub operator_namespace: String,
    pub oauth_clients_secret: String,
    /// Cluster API endpoint used as the platform identity provider base URL.
    pub api_url: String,
    /// Reported for the identity server operator, which does not publish one itself.
    pub operator_version: String,
    pub customer_admin_password: String,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            oauth_clients_secret: DEFAULT_OAUTH_CLIENTS_SECRET.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            operator_version: DEFAULT_OPERATOR_VERSION.to_string(),
            customer_admin_password: DEFAULT_CUSTOMER_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl ReconcilerSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            operator_namespace: env_or("SSO_OPERATOR_NAMESPACE", defaults.operator_namespace),
            oauth_clients_secret: env_or("SSO_OAUTH_CLIENTS_SECRET", defaults.oauth_clients_secret),
            api_url: env_or("SSO_API_URL", defaults.api_url),
            operator_version: env_or("SSO_OPERATOR_VERSION", defaults.operator_version),
            customer_admin_password: env_or(
                "SSO_CUSTOMER_ADMIN_PASSWORD",
                defaults.customer_admin_password,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub sync_interval: Duration,
    /// JSON snapshot of the local cluster state, read before and written after each pass.
    pub state_path: PathBuf,
    /// Product configuration file. When unset, configuration lives in the
    /// state file.
    pub config_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            config_path: None,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, SettingsError> {
        let mut config = Self::default();
        if let Ok(value) = env::var("SSO_SYNC_INTERVAL_SECS") {
            config.sync_interval = parse_interval("SSO_SYNC_INTERVAL_SECS", &value)?;
        }
        if let Ok(path) = env::var("SSO_STATE_PATH") {
            config.state_path = PathBuf::from(path);
        }
        if let Some(path) = env::var("SSO_CONFIG_PATH").ok().filter(|p| !p.trim().is_empty()) {
            config.config_path = Some(PathBuf::from(path));
        }
        Ok(config)
    }
}

fn parse_interval(var: &'static str, value: &str) -> Result<Duration, SettingsError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(SettingsError::InvalidInterval {
            var,
            value: value.to_string(),
        }),
    }
}

fn env_or(var: &str, default: String) -> String {
    env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(default)
}
