//! Directory diff and merge between the external directory and a realm's users.
//!
//! Users are joined on `username == account.name`. The reserved
//! administrative account is never reported for removal. Removal compacts the
//! list by swapping in the last element, so the relative order of internal
//! users is **not** preserved across a sync pass.
use std::collections::HashSet;

use serde::Serialize;

use crate::roles::roles_for;
use crate::users::{ExternalAccount, FederatedIdentity, Group, InternalUser, email_for};

/// Accounts to add and positions in the internal list to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryDiff {
    pub added: Vec<ExternalAccount>,
    pub removed: Vec<usize>,
}

impl DirectoryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Computes which external accounts are missing internally and which internal
/// users (by index) no longer exist externally.
///
/// ```
/// use sso_core::{diff_users, ExternalAccount, InternalUser};
///
/// let internal: Vec<InternalUser> = ["customer-admin", "alice", "bob"]
///     .into_iter()
///     .map(|name| InternalUser { username: name.into(), ..Default::default() })
///     .collect();
/// let external = vec![ExternalAccount::new("alice", "1"), ExternalAccount::new("carol", "2")];
///
/// let diff = diff_users(&internal, &external);
/// assert_eq!(diff.added, vec![ExternalAccount::new("carol", "2")]);
/// assert_eq!(diff.removed, vec![2]);
/// ```
pub fn diff_users(internal: &[InternalUser], external: &[ExternalAccount]) -> DirectoryDiff {
    let internal_names: HashSet<&str> = internal.iter().map(|u| u.username.as_str()).collect();
    let external_names: HashSet<&str> = external.iter().map(|a| a.name.as_str()).collect();

    let mut seen = HashSet::new();
    let added = external
        .iter()
        .filter(|account| !internal_names.contains(account.name.as_str()))
        .filter(|account| seen.insert(account.name.as_str()))
        .cloned()
        .collect();

    let removed = internal
        .iter()
        .enumerate()
        .filter(|(_, user)| {
            !user.is_customer_admin() && !external_names.contains(user.username.as_str())
        })
        .map(|(index, _)| index)
        .collect();

    DirectoryDiff { added, removed }
}

/// Removes the users at `indexes` with swap-remove and returns them.
///
/// Indexes are applied from highest to lowest so every index still refers to
/// the element it named when the diff was computed. Out-of-range and
/// duplicate indexes are ignored.
pub fn remove_indexes(users: &mut Vec<InternalUser>, indexes: &[usize]) -> Vec<InternalUser> {
    let mut ordered = indexes.to_vec();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();
    let mut removed = Vec::with_capacity(ordered.len());
    for index in ordered {
        if index < users.len() {
            removed.push(users.swap_remove(index));
        }
    }
    removed
}

/// Inserts `user` unless one with the same username exists.
pub fn ensure_user(users: &mut Vec<InternalUser>, user: InternalUser) -> bool {
    if users.iter().any(|u| u.username == user.username) {
        return false;
    }
    users.push(user);
    true
}

/// What a sync pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub roles_changed: Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.roles_changed.is_empty()
    }
}

/// Applies the directory diff to `users` and recomputes the role bundle of
/// every remaining non-administrative user from `privileged` membership.
///
/// New users are linked to `identity_provider` through a federated identity
/// carrying the account uid.
pub fn synchronize_users(
    users: &mut Vec<InternalUser>,
    accounts: &[ExternalAccount],
    privileged: &Group,
    identity_provider: &str,
) -> SyncReport {
    let diff = diff_users(users, accounts);
    let mut report = SyncReport {
        removed: remove_indexes(users, &diff.removed)
            .into_iter()
            .map(|u| u.username)
            .collect(),
        ..SyncReport::default()
    };

    for account in diff.added {
        report.added.push(account.name.clone());
        users.push(InternalUser {
            username: account.name.clone(),
            email: email_for(&account.name),
            email_verified: true,
            enabled: true,
            federated_identities: vec![FederatedIdentity {
                identity_provider: identity_provider.to_string(),
                user_id: account.uid,
                user_name: account.name,
            }],
            ..InternalUser::default()
        });
    }

    for user in users.iter_mut().filter(|u| !u.is_customer_admin()) {
        let roles = roles_for(privileged.contains(&user.username));
        if user.client_roles != roles {
            user.client_roles = roles;
            if !report.added.contains(&user.username) {
                report.roles_changed.push(user.username.clone());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::REALM_MANAGEMENT_CLIENT;
    use crate::users::{CUSTOMER_ADMIN_USERNAME, customer_admin_user};

    fn user(name: &str) -> InternalUser {
        InternalUser {
            username: name.into(),
            ..InternalUser::default()
        }
    }

    fn names(users: &[InternalUser]) -> Vec<&str> {
        let mut names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn diff_adds_missing_and_removes_stale_users() {
        let internal = vec![user(CUSTOMER_ADMIN_USERNAME), user("alice"), user("bob")];
        let external = vec![
            ExternalAccount::new("alice", "u1"),
            ExternalAccount::new("carol", "u2"),
        ];

        let diff = diff_users(&internal, &external);

        assert_eq!(diff.added, vec![ExternalAccount::new("carol", "u2")]);
        assert_eq!(diff.removed, vec![2]);
        assert_eq!(internal[diff.removed[0]].username, "bob");
    }

    #[test]
    fn admin_is_never_removed_even_with_empty_directory() {
        let internal = vec![user("alice"), user(CUSTOMER_ADMIN_USERNAME), user("bob")];
        let diff = diff_users(&internal, &[]);
        assert_eq!(diff.removed, vec![0, 2]);
        assert!(diff.removed.iter().all(|&i| !internal[i].is_customer_admin()));
    }

    #[test]
    fn duplicate_directory_names_are_added_once() {
        let external = vec![ExternalAccount::new("dave", "u1"), ExternalAccount::new("dave", "u1")];
        let diff = diff_users(&[], &external);
        assert_eq!(diff.added.len(), 1);
    }

    #[test]
    fn remove_indexes_removes_exactly_the_named_users() {
        let mut users: Vec<_> = ["a", "b", "c", "d", "e"].into_iter().map(user).collect();
        let removed = remove_indexes(&mut users, &[1, 3, 3, 9]);
        assert_eq!(names(&removed), vec!["b", "d"]);
        assert_eq!(names(&users), vec!["a", "c", "e"]);
    }

    #[test]
    fn sync_promotes_existing_user_without_readding() {
        let mut users = vec![customer_admin_user("pw"), user("alice")];
        let accounts = vec![ExternalAccount::new("alice", "u1")];
        let mut admins = Group {
            name: "dedicated-admins".into(),
            users: Vec::new(),
        };

        let first = synchronize_users(&mut users, &accounts, &admins, "openshift-v4");
        assert!(first.added.is_empty());
        assert_eq!(first.roles_changed, vec!["alice"]);
        assert!(!users[1].client_roles.contains_key(REALM_MANAGEMENT_CLIENT));

        admins.users.push("alice".into());
        let second = synchronize_users(&mut users, &accounts, &admins, "openshift-v4");
        assert!(second.added.is_empty() && second.removed.is_empty());
        assert_eq!(second.roles_changed, vec!["alice"]);
        assert!(users[1].client_roles.contains_key(REALM_MANAGEMENT_CLIENT));
    }

    #[test]
    fn sync_links_new_users_to_identity_provider() {
        let mut users = Vec::new();
        let accounts = vec![ExternalAccount::new("carol", "uid-7")];
        let report = synchronize_users(&mut users, &accounts, &Group::default(), "openshift-v4");

        assert_eq!(report.added, vec!["carol"]);
        assert!(report.roles_changed.is_empty());
        let carol = &users[0];
        assert_eq!(carol.email, "carol@example.com");
        assert!(carol.enabled && carol.email_verified);
        assert_eq!(
            carol.federated_identities,
            vec![FederatedIdentity {
                identity_provider: "openshift-v4".into(),
                user_id: "uid-7".into(),
                user_name: "carol".into(),
            }]
        );
        assert_eq!(carol.client_roles, roles_for(false));
    }

    #[test]
    fn second_pass_without_directory_change_is_a_no_op() {
        let mut users = vec![customer_admin_user("pw"), user("bob")];
        let accounts = vec![
            ExternalAccount::new("alice", "u1"),
            ExternalAccount::new("carol", "u2"),
        ];
        let admins = Group {
            name: "dedicated-admins".into(),
            users: vec!["carol".into()],
        };

        synchronize_users(&mut users, &accounts, &admins, "openshift-v4");
        let snapshot = users.clone();
        let report = synchronize_users(&mut users, &accounts, &admins, "openshift-v4");

        assert!(report.is_empty());
        assert_eq!(users, snapshot);
    }

    #[test]
    fn sync_matches_directory_for_every_membership_combination() {
        let pool = ["a", "b", "c", "d", "e", "f", CUSTOMER_ADMIN_USERNAME];
        let pick = |mask: u32| -> Vec<&'static str> {
            pool.iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, name)| *name)
                .collect()
        };
        let nobody = Group {
            name: "dedicated-admins".into(),
            users: Vec::new(),
        };

        for internal_mask in 0..1u32 << pool.len() {
            for external_mask in 0..1u32 << pool.len() {
                let mut users: Vec<_> = pick(internal_mask).into_iter().map(user).collect();
                let accounts: Vec<_> = pick(external_mask)
                    .into_iter()
                    .map(|name| ExternalAccount::new(name, name))
                    .collect();

                let diff = diff_users(&users, &accounts);
                assert!(diff.removed.iter().all(|&i| !users[i].is_customer_admin()));

                synchronize_users(&mut users, &accounts, &nobody, "openshift-v4");

                let mut expected = pick(external_mask);
                if internal_mask & (1 << 6) != 0 && !expected.contains(&CUSTOMER_ADMIN_USERNAME) {
                    expected.push(CUSTOMER_ADMIN_USERNAME);
                }
                expected.sort_unstable();
                assert_eq!(
                    names(&users),
                    expected,
                    "internal {internal_mask:#b} external {external_mask:#b}"
                );
            }
        }
    }
}
