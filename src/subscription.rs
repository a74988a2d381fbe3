//! Interface to the external subscription-matching engine.
//!
//! Deciding whether a discovered instance or an inbound update is still
//! wanted is not this crate's job; the matcher owns that logic (including
//! class-hierarchy promotion). The directory records subscribe/unsubscribe
//! intents through it, forwards them to the coordinator, and asks yes/no
//! questions when remote events arrive. Its internal state is persisted as
//! an opaque blob inside the directory snapshot.

use crate::handle::{AttributeHandleSet, InteractionClassHandle, ObjectClassHandle};

/// The external subscription-matching engine.
pub trait SubscriptionMatcher: Send + Sync {
    /// Resolves a producer's object class to the class this federate is
    /// subscribed at (possibly a superclass), or `None` when the discovery
    /// or update should be dropped.
    fn subscribed_object_class(&self, class: ObjectClassHandle) -> Option<ObjectClassHandle>;

    fn interaction_class_subscribed(&self, class: InteractionClassHandle) -> bool;

    fn subscribe_object_class_attributes(
        &mut self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    );

    fn unsubscribe_object_class(&mut self, class: ObjectClassHandle);

    fn subscribe_interaction_class(&mut self, class: InteractionClassHandle);

    fn unsubscribe_interaction_class(&mut self, class: InteractionClassHandle);

    /// Opaque state for the federation snapshot.
    fn save_state(&self) -> Vec<u8>;

    /// Restores state previously produced by [`SubscriptionMatcher::save_state`].
    fn restore_state(&mut self, state: &[u8]);
}
