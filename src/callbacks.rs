//! The application callback interface.
//!
//! Remote-origin events are delivered to the application on whatever thread
//! the network event arrived on, after the directory's own state is
//! consistent. Delivery is best-effort: a failure from the application is
//! logged and swallowed, never allowed back into the directory.

use crate::handle::{
    AttributeHandle, AttributeValueMap, FederateHandle, ObjectClassHandle, ObjectInstanceHandle,
};

/// Error an application callback may return. It is logged, not propagated.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CallbackError(pub String);

/// Answer to an ownership query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeOwner {
    Federate(FederateHandle),
    Unowned,
}

/// Callbacks produced for the application.
pub trait FederateCallbacks: Send + Sync {
    fn discover_instance(
        &self,
        instance: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: &str,
        producer: FederateHandle,
    ) -> Result<(), CallbackError>;

    fn remove_instance(
        &self,
        instance: ObjectInstanceHandle,
        tag: &[u8],
    ) -> Result<(), CallbackError>;

    fn reflect_attributes(
        &self,
        instance: ObjectInstanceHandle,
        values: &AttributeValueMap,
        tag: &[u8],
    ) -> Result<(), CallbackError>;

    /// The coordinator granted an acquisition.
    fn acquisition_notification(
        &self,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> Result<(), CallbackError>;

    /// A peer wants attributes this federate owns; the application decides
    /// what to release (typically by calling `release_if_wanted`).
    fn release_requested(
        &self,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> Result<(), CallbackError>;

    /// The coordinator asks whether a negotiated divestiture should go
    /// through; the application answers with `confirm_divestiture` or
    /// `cancel_negotiated_divestiture`.
    fn divestiture_notification(
        &self,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), CallbackError>;

    /// Answer to an earlier ownership query.
    fn ownership_report(
        &self,
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
        owner: AttributeOwner,
    ) -> Result<(), CallbackError>;

    fn name_reservation_succeeded(&self, name: &str) -> Result<(), CallbackError>;

    fn name_reservation_failed(&self, name: &str) -> Result<(), CallbackError>;
}

/// Logs a failed callback and moves on.
pub(crate) fn dispatch(what: &str, result: Result<(), CallbackError>) {
    if let Err(error) = result {
        log::warn!("{} callback failed: {}", what, error);
    }
}
