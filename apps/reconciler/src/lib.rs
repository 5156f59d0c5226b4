//! Phased reconciliation of the RHSSO identity server product: finalizer,
//! namespace, subscription, components, progress, monitoring, status.

mod components;
mod finalizer;
pub mod harness;
mod monitoring;
mod progress;
pub mod reconciler;
pub mod settings;
pub mod worker;

pub use harness::*;
pub use reconciler::*;
pub use settings::*;
pub use worker::*;
