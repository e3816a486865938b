//! Feed synchronization.
//!
//! - [`registry`]: which feed items have been seen or posted
//! - [`gate`]: minimum spacing between automatic publications
//! - [`publisher`]: formatting and two-stage publication of one item
//! - [`engine`]: the sync cycle tying them together

pub mod engine;
pub mod gate;
pub mod publisher;
pub mod registry;

pub use engine::{CycleReport, CycleSummary, EngineState, ItemReport, SyncEngine};
pub use gate::{may_auto_publish, PublishClock};
pub use publisher::{truncate, PublishError, PublishReceipt, Publisher, TRUNCATION_SUFFIX};
pub use registry::{ReconcileStats, VisitStatus, VisitedRegistry};
