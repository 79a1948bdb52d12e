//! # pic-policy
//!
//! Maps tool names to PIC impact classes and decides which classes must carry
//! an Action Proposal and trusted evidence.
//!
//! ## Key invariants
//!
//! - **Unclassified tools pass**: a tool absent from `impact_by_tool` needs no
//!   proposal.
//! - **High impact is fixed**: money, privacy and irreversible always require
//!   a proposal and evidence.
//! - **No implicit reload**: a [`PolicyEngine`] never changes after load.

pub mod engine;
pub mod error;

pub use engine::{PolicyEngine, PolicySource, DEFAULT_POLICY_FILE, POLICY_PATH_ENV};
pub use error::PolicyError;
