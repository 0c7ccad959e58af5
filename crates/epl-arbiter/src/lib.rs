//! Execution policy layer for EPL.
//!
//! Decides, per instrument, what to do with each admitted signal candidate:
//! - `CandidateValidator`: rejects malformed candidates
//! - `CandidatePool`: rolling near-duplicate filter
//! - `ActivePositionRegistry`: one accepted candidate per symbol
//! - `ArbitrationEngine`: REPLACE / ENHANCE / NEW_ORDER / IGNORE
//! - `PriorityClassifier`: quality score to urgency tier

pub mod arbitration;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod error;
pub mod registry;
pub mod validator;

pub use arbitration::ArbitrationEngine;
pub use classifier::PriorityClassifier;
pub use config::{ArbitrationConfig, DedupConfig, PriorityThresholds, ValidationConfig};
pub use dedup::{jaccard_similarity, CandidatePool, DuplicateMatch, DuplicateRule};
pub use error::ValidationError;
pub use registry::{ActivePosition, ActivePositionRegistry};
pub use validator::CandidateValidator;
