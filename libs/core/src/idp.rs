//! Identity provider entries and the first-write-wins merge into a realm.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One federated login source attached to a realm. `alias` is unique within
/// the realm's provider list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProvider {
    pub alias: String,
    pub provider_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub trust_email: bool,
    #[serde(default)]
    pub store_token: bool,
    #[serde(default)]
    pub add_read_token_role_on_create: bool,
    #[serde(default)]
    pub link_only: bool,
    #[serde(default)]
    pub first_broker_login_flow_alias: String,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

pub fn contains_provider(providers: &[IdentityProvider], alias: &str) -> bool {
    providers.iter().any(|p| p.alias == alias)
}

/// Appends `entry` unless a provider with the same alias is already present.
///
/// The existing entry always wins, so changed settings such as a rotated
/// client secret are not applied to a provider that already exists. Returns
/// whether the entry was added.
///
/// ```
/// use sso_core::{IdentityProvider, merge_provider};
///
/// let mut providers = Vec::new();
/// let github = IdentityProvider { alias: "github".into(), ..Default::default() };
/// assert!(merge_provider(&mut providers, github.clone()));
/// assert!(!merge_provider(&mut providers, github));
/// assert_eq!(providers.len(), 1);
/// ```
pub fn merge_provider(providers: &mut Vec<IdentityProvider>, entry: IdentityProvider) -> bool {
    if contains_provider(providers, &entry.alias) {
        return false;
    }
    providers.push(entry);
    true
}
