use thiserror::Error;

use crate::resource::ObjectKey;

/// Errors raised by a [`crate::ResourceClient`] backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(ObjectKey),
    #[error("{0} already exists")]
    AlreadyExists(ObjectKey),
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: ObjectKey,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {kind} {name}: {source}")]
    Encode {
        kind: &'static str,
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("resource backend error: {0}")]
    Backend(String),
}

impl ClientError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClientError::AlreadyExists(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {product} config: {reason}")]
    Read { product: String, reason: String },
    #[error("failed to write {product} config: {reason}")]
    Write { product: String, reason: String },
}

/// Which persistence call a convergence failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Create,
    Update,
    Mutate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Mutate => "mutate",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConvergeError {
    #[error("failed to {operation} {key}: {source}")]
    Client {
        operation: Operation,
        key: ObjectKey,
        #[source]
        source: ClientError,
    },
    #[error("failed to mutate {key}: {source:#}")]
    Mutate {
        key: ObjectKey,
        #[source]
        source: anyhow::Error,
    },
}

impl ConvergeError {
    pub fn key(&self) -> &ObjectKey {
        match self {
            ConvergeError::Client { key, .. } | ConvergeError::Mutate { key, .. } => key,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            ConvergeError::Client { operation, .. } => *operation,
            ConvergeError::Mutate { .. } => Operation::Mutate,
        }
    }
}

/// Failure of a reconciliation step.
///
/// Configuration problems (missing secrets or fields) and persistence failures
/// both end up here; the loop maps every variant to a `Failed` phase and
/// relies on the next poll to retry.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("could not find secret {namespace}/{name}")]
    MissingSecret { name: String, namespace: String },
    #[error("could not find {key} key in secret {namespace}/{name}")]
    MissingSecretKey {
        name: String,
        namespace: String,
        key: String,
    },
    #[error("could not retrieve {kind} {namespace}/{name}")]
    MissingResource {
        kind: &'static str,
        name: String,
        namespace: String,
    },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Converge(#[from] ConvergeError),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ReconcileError>,
    },
    #[error("{0:#}")]
    Collaborator(#[from] anyhow::Error),
}

impl ReconcileError {
    /// Wraps the error with a description of what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        ReconcileError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context layers.
    pub fn root(&self) -> &ReconcileError {
        match self {
            ReconcileError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_layers_render_outermost_first() {
        let err = ReconcileError::MissingSecret {
            name: "github-oauth-secret".into(),
            namespace: "operator".into(),
        }
        .context("failed to setup github identity provider");
        assert_eq!(
            err.to_string(),
            "failed to setup github identity provider: could not find secret operator/github-oauth-secret"
        );
        assert!(matches!(err.root(), ReconcileError::MissingSecret { .. }));
    }
}
