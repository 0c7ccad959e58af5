//! Tiered dissemination of arbitration decisions.
//!
//! - `TieredRouter`: routes each decision by priority tier
//! - `NotificationChannel`: channel adapter capability
//! - `DispatchScheduler`: cancellable delayed sends and side tasks
//! - `MediumBatchWindow`, `FocusWatchList`, `RiskAssessment`: tier side effects

pub mod batch;
pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod risk;
pub mod router;
pub mod scheduler;
pub mod watchlist;

pub use batch::{BatchEntry, BatchSummary, MediumBatchWindow};
pub use buffer::RingBuffer;
pub use channel::{
    deliver, BoxFuture, ChannelDelivery, ChannelSet, DeliveryStatus, DynChannel, LogChannel,
    NotificationChannel, RecordingChannel,
};
pub use config::DispatchConfig;
pub use error::{ChannelError, ChannelResult};
pub use risk::{RiskAssessment, RiskLevel};
pub use router::{DispatchPath, DispatchReport, DisplayEntry, ResearchRecord, TieredRouter};
pub use scheduler::DispatchScheduler;
pub use watchlist::{FocusEntry, FocusWatchList};
