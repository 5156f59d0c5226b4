//! Core contracts and value types for the SSO convergence engine.
//!
//! This crate holds the data model (identity server, realm, users, product
//! configuration), the collaborator traits the reconciliation loop talks to
//! together with in-memory implementations, and the pure algorithms the loop
//! relies on: identity provider merging, directory diffing and role policy.
pub mod config;
pub mod converge;
pub mod directory;
pub mod error;
pub mod events;
pub mod identity;
pub mod idp;
pub mod installation;
pub mod monitoring;
pub mod oauth;
pub mod ownership;
pub mod phase;
pub mod platform;
pub mod resource;
pub mod roles;
pub mod secrets;
pub mod sync;
pub mod users;

pub use config::*;
pub use converge::*;
pub use directory::*;
pub use error::*;
pub use events::*;
pub use identity::*;
pub use idp::*;
pub use installation::*;
pub use monitoring::*;
pub use oauth::*;
pub use ownership::*;
pub use phase::*;
pub use platform::*;
pub use resource::*;
pub use roles::*;
pub use secrets::*;
pub use sync::*;
pub use users::*;
