//! Secret-sharing schemes over [`crate::field::FieldElement`]: Shamir,
//! additive, replicated (CNF), and a hybrid selector between them.

pub mod additive;
pub mod hybrid;
pub mod replicated;
pub mod shamir;
pub mod share;

pub use additive::AdditiveSecretSharing;
pub use hybrid::{HybridChoice, HybridSecretSharing};
pub use replicated::ReplicatedSecretSharing;
pub use shamir::ShamirSecretSharing;
pub use share::{
    CommitmentAlgorithm, ReplicatedComponents, Share, ShareMetadata, ShareScheme, ShareVerification,
};
