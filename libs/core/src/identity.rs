//! Identity server and realm resources.
use serde::{Deserialize, Serialize};

use crate::idp::IdentityProvider;
use crate::resource::{LabelSelector, ObjectMeta, Resource};
use crate::users::InternalUser;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityServer {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: IdentityServerSpec,
    #[serde(default)]
    pub status: IdentityServerStatus,
}

impl Resource for IdentityServer {
    const KIND: &'static str = "IdentityServer";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityServerSpec {
    #[serde(default)]
    pub instances: u32,
    #[serde(default)]
    pub external_access: ExternalAccess,
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Name of the admin credential secret; filled in by the server's own operator.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub admin_credentials: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccess {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityServerStatus {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Realm {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RealmSpec,
    #[serde(default)]
    pub status: RealmStatus,
}

impl Resource for Realm {
    const KIND: &'static str = "Realm";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSpec {
    #[serde(default)]
    pub realm: RealmDefinition,
    /// Links the realm to the identity server instance by label.
    #[serde(default)]
    pub instance_selector: LabelSelector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub realm_overrides: Vec<RedirectorOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub events_listeners: Vec<String>,
    /// Immutable once the realm exists: entries are only ever appended before
    /// the first create, never rewritten.
    #[serde(default)]
    pub identity_providers: Vec<IdentityProvider>,
    #[serde(default)]
    pub users: Vec<InternalUser>,
}

/// Sends a login flow straight to one identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectorOverride {
    pub identity_provider: String,
    pub for_flow: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RealmPhase {
    Reconciling,
    Failing,
    Initialising,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RealmPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RealmPhase::Reconciling => "reconciling",
            RealmPhase::Failing => "failing",
            RealmPhase::Initialising => "initialising",
            RealmPhase::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RealmPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmStatus {
    #[serde(default)]
    pub phase: RealmPhase,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_realm_phase_deserializes_as_unknown() {
        let status: RealmStatus =
            serde_json::from_value(serde_json::json!({"phase": "provisioning"})).unwrap();
        assert_eq!(status.phase, RealmPhase::Unknown);
        let status: RealmStatus =
            serde_json::from_value(serde_json::json!({"phase": "reconciling"})).unwrap();
        assert_eq!(status.phase, RealmPhase::Reconciling);
    }
}
