//! # pic-proposal
//!
//! The PIC/1.0 Action Proposal: data model, schema validation, and the
//! [`Decision`] value every evaluation produces.
//!
//! An agent that wants to perform a side-effecting tool call attaches an
//! [`ActionProposal`] declaring intent, impact class, provenance, claims and
//! evidence. [`validate_proposal`] turns untrusted JSON into a typed proposal
//! or reports the first violated constraint.
//!
//! ## Key invariants
//!
//! - **All-or-nothing parsing**: a proposal is either fully valid or rejected.
//! - **Immutable proposals**: trust upgrades live in [`TrustOverrides`], never
//!   in the proposal itself.
//! - **Decisions are values**: `error` is present exactly when `allowed` is false.

pub mod decision;
pub mod error;
pub mod proposal;
pub mod schema;
pub mod trust;

pub use decision::{Decision, DecisionError, ErrorCode, PicError};
pub use error::SchemaError;
pub use proposal::{
    ActionProposal, Claim, EvidenceEntry, HashEvidence, ImpactClass, ProvenanceEntry,
    SigEvidence, ToolBinding, TrustLevel, PROTOCOL_VERSION,
};
pub use schema::{json_type_name, parse_proposal, validate_proposal};
pub use trust::TrustOverrides;
