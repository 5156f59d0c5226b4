//! Internal user records and the external directory accounts they mirror.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roles::{RoleBundle, roles_for};

/// Bootstrap account managed by the engine itself; never removed by a sync.
pub const CUSTOMER_ADMIN_USERNAME: &str = "customer-admin";
pub const CUSTOMER_ADMIN_EMAIL: &str = "customer-admin@example.com";
/// Domain appended to directory names that are not already email addresses.
pub const FALLBACK_EMAIL_DOMAIN: &str = "example.com";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub client_roles: RoleBundle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub federated_identities: Vec<FederatedIdentity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<Credential>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl InternalUser {
    pub fn is_customer_admin(&self) -> bool {
        self.username == CUSTOMER_ADMIN_USERNAME
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentity {
    pub identity_provider: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub temporary: bool,
}

/// Read-only account from the external directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub name: String,
    pub uid: String,
}

impl ExternalAccount {
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

impl Group {
    pub fn contains(&self, username: &str) -> bool {
        self.users.iter().any(|u| u == username)
    }
}

/// The reserved administrative account with a non-temporary password.
pub fn customer_admin_user(password: &str) -> InternalUser {
    InternalUser {
        username: CUSTOMER_ADMIN_USERNAME.to_string(),
        email: CUSTOMER_ADMIN_EMAIL.to_string(),
        email_verified: true,
        enabled: true,
        client_roles: roles_for(true),
        credentials: vec![Credential {
            kind: "password".to_string(),
            value: password.to_string(),
            temporary: false,
        }],
        ..InternalUser::default()
    }
}

/// Email for a directory name: kept as-is when it already looks like an address.
pub fn email_for(name: &str) -> String {
    if name.contains('@') {
        name.to_string()
    } else {
        format!("{name}@{FALLBACK_EMAIL_DOMAIN}")
    }
}
