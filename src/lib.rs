//! lattice-federate — the federate-side object and ownership directory for
//! a distributed simulation federation.
//!
//! Each joined federate keeps its own view of the federation's object
//! instances and of which attributes it owns, is divesting, or is trying to
//! acquire. A remote coordinator adjudicates conflicting requests across
//! federates; this crate tracks and reacts to that protocol but never
//! arbitrates it. The FOM document model, wire encoding, transport, time
//! management and subscription matching are all external, consumed through
//! the traits in [`fom`], [`link`] and [`subscription`].
//!
//! The design is classic shared-mutable-state-under-locks: application
//! threads call [`manager::ObjectManager`] operations concurrently while a
//! network thread applies coordinator events through the `on_*` methods,
//! all under a fixed lock order (publication → subscription → directory →
//! instance → reservation).

pub mod callbacks;
pub mod config;
pub mod directory;
pub mod error;
pub mod fom;
pub mod handle;
pub mod link;
pub(crate) mod locks;
pub mod manager;
pub mod ownership;
pub mod persistence;
pub mod publication;
pub mod reservation;
pub mod subscription;

pub use callbacks::{AttributeOwner, CallbackError, FederateCallbacks};
pub use config::FederateConfig;
pub use directory::{Directory, ObjectInstance};
pub use error::{FederateError, FederateResult};
pub use handle::{
    AttributeHandle, AttributeHandleSet, AttributeValueMap, FederateHandle,
    InteractionClassHandle, ObjectClassHandle, ObjectInstanceHandle, ParameterHandle,
    ParameterValueMap,
};
pub use link::{CoordinatorLink, CorrelationId, Message, Response, SendOrder};
pub use manager::{ObjectManager, ResignAction};
pub use ownership::{AttributeOwnershipRecord, OwnershipState, OwnershipTracker};
pub use publication::PublicationSet;
pub use reservation::ReservationSet;
pub use subscription::SubscriptionMatcher;

#[cfg(test)]
pub(crate) mod testing;
