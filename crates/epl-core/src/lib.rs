//! Core domain types for the EPL signal arbitration engine.
//!
//! This crate provides the types shared by every stage of the pipeline:
//! - `SignalCandidate`: an immutable proposed trade signal
//! - `Decision`, `Action`, `Priority`: the arbitration outcome
//! - `NotificationMessage`, `ChannelKind`: the dissemination payload

pub mod candidate;
pub mod decision;
pub mod error;
pub mod notification;

pub use candidate::{CandidateId, Direction, SignalCandidate};
pub use decision::{Action, Decision, ExecutionParams, Priority};
pub use error::{CoreError, Result};
pub use notification::{ChannelKind, NotificationId, NotificationMessage};
