//! # pic-verifier
//!
//! The causal verifier and the evaluation pipeline for PIC Action Proposals.
//!
//! [`Pipeline`] turns a tool call (and the proposal riding inside it) into a
//! [`Decision`](pic_proposal::Decision): limits, schema, tool binding,
//! optional evidence verification, then the [`CausalVerifier`].
//!
//! ## Key invariants
//!
//! - **Fail closed**: every error, including a panic, yields `allowed: false`.
//! - **No allow without passing**: `allowed: true` is only reachable after
//!   every stage required for the impact class has passed.
//! - **Bounded before parsed**: byte and item limits run before typed parsing.
//! - **Deterministic**: the same inputs always produce the same `allowed` and
//!   `code`; only `eval_ms` varies.

pub mod causal;
pub mod envelope;
pub mod limits;
pub mod pipeline;

pub use causal::{check_binding, check_linkage, CausalVerifier};
pub use envelope::{ToolCall, PIC_ENVELOPE_KEY, PIC_REQUEST_ID_KEY};
pub use limits::{Deadline, EvaluationLimits, Stage};
pub use pipeline::{Pipeline, PipelineOptions};
