//! NAT-traversal mechanism set, ordering policy, and the engine that drives
//! them (§4.G): gather dial candidates from every registered mechanism in
//! parallel, order them deterministically, then dial serially with
//! controlled fallback.

pub mod candidate;
pub mod context;
pub mod engine;
pub mod mechanism;
pub mod policy;

pub use candidate::{dedupe, Candidate};
pub use context::Context;
pub use engine::TraversalEngine;
pub use mechanism::{DirectMechanism, HolePunchMechanism, Mechanism, RelayMechanism};
pub use policy::{DefaultPolicy, Policy};
