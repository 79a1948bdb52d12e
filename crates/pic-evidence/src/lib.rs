//! # pic-evidence
//!
//! Verifies the evidence attached to a PIC Action Proposal.
//!
//! Two independent paths, chosen by the entry's `type`:
//!
//! - **hash**: a `file://` artifact inside the sandbox root whose SHA-256
//!   must match the declared digest.
//! - **sig**: an Ed25519 signature over `payload` by a signer that is `ok`
//!   in the [`TrustedKeyRing`](pic_keyring::TrustedKeyRing).
//!
//! ## Key invariants
//!
//! - **Read-only**: evidence files are only ever read, never written, and no
//!   network URI is followed.
//! - **Bounded**: no file larger than `max_file_bytes` is hashed to completion.
//! - **Upgrade only**: verified ids can raise provenance trust, never lower it.

pub mod error;
pub mod hasher;
pub mod sandbox;
pub mod signature;
pub mod system;

pub use error::EvidenceError;
pub use hasher::{hash_bytes, hash_file_capped};
pub use signature::verify_signature;
pub use system::{
    EvidenceReport, EvidenceResult, EvidenceSettings, EvidenceSystem, DEFAULT_MAX_FILE_BYTES,
};
