//! Attribute ownership tracking.
//!
//! One record per locally relevant attribute, one tracker per object
//! instance. The tracker is the single source of truth for the ownership
//! state machine; every transition's precondition is checked here and
//! nowhere else.

pub mod record;
pub mod tracker;

pub use record::{AttributeOwnershipRecord, OwnershipState};
pub use tracker::OwnershipTracker;
