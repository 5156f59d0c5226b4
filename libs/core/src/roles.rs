use std::collections::BTreeMap;

/// Client id → role names granted on that client.
pub type RoleBundle = BTreeMap<String, Vec<String>>;

pub const ACCOUNT_CLIENT: &str = "account";
pub const BROKER_CLIENT: &str = "broker";
pub const REALM_MANAGEMENT_CLIENT: &str = "realm-management";

/// Role bundle for a directory user. Everyone gets self-service account and
/// broker token roles; privileged users additionally manage the realm.
///
/// ```
/// use sso_core::{roles_for, REALM_MANAGEMENT_CLIENT};
///
/// assert!(!roles_for(false).contains_key(REALM_MANAGEMENT_CLIENT));
/// assert_eq!(roles_for(true)[REALM_MANAGEMENT_CLIENT].len(), 3);
/// ```
pub fn roles_for(privileged: bool) -> RoleBundle {
    let mut roles = RoleBundle::from([
        (
            ACCOUNT_CLIENT.to_string(),
            vec!["manage-account".to_string(), "view-profile".to_string()],
        ),
        (BROKER_CLIENT.to_string(), vec!["read-token".to_string()]),
    ]);
    if privileged {
        roles.insert(
            REALM_MANAGEMENT_CLIENT.to_string(),
            vec![
                "manage-users".to_string(),
                "manage-identity-providers".to_string(),
                "view-realm".to_string(),
            ],
        );
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_bundle_is_shared_by_both_outcomes() {
        let base = roles_for(false);
        let privileged = roles_for(true);
        for (client, roles) in &base {
            assert_eq!(&privileged[client], roles);
        }
        assert_eq!(base[BROKER_CLIENT], vec!["read-token"]);
        assert_eq!(
            privileged[REALM_MANAGEMENT_CLIENT],
            vec!["manage-users", "manage-identity-providers", "view-realm"]
        );
    }
}
