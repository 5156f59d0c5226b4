use serde::{Deserialize, Serialize};

use crate::phase::StatusPhase;

/// The multi-product deployment every created resource belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub name: String,
    #[serde(default)]
    pub namespace_prefix: String,
    #[serde(default)]
    pub finalizers: Vec<String>,
    #[serde(default)]
    pub deletion_requested: bool,
}

impl Installation {
    pub fn new(name: impl Into<String>, namespace_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace_prefix: namespace_prefix.into(),
            ..Self::default()
        }
    }

    /// Identity recorded as the owner of created resources.
    pub fn owner_id(&self) -> &str {
        &self.name
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    pub fn add_finalizer(&mut self, finalizer: &str) -> bool {
        if self.has_finalizer(finalizer) {
            return false;
        }
        self.finalizers.push(finalizer.to_string());
        true
    }

    pub fn remove_finalizer(&mut self, finalizer: &str) -> bool {
        let before = self.finalizers.len();
        self.finalizers.retain(|f| f != finalizer);
        before != self.finalizers.len()
    }
}

/// Per-product slice of the installation status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<StatusPhase>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub operator_version: String,
}

impl ProductStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalizers_are_added_once() {
        let mut installation = Installation::new("integreatly", "redhat-");
        assert!(installation.add_finalizer("finalizer.rhsso.integreatly.org"));
        assert!(!installation.add_finalizer("finalizer.rhsso.integreatly.org"));
        assert!(installation.remove_finalizer("finalizer.rhsso.integreatly.org"));
        assert!(installation.finalizers.is_empty());
    }
}
