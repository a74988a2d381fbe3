//! Error handling for the federate runtime.
//!
//! Every public operation either completes or returns one of these named
//! failures; there is no catch-all for precondition violations. The variants
//! fall into four groups: precondition violations (caller state errors,
//! always recoverable, never corrupt local state), definition errors
//! (delegated to the FOM), communication failures (the remote round trip did
//! not complete — distinct from a protocol-level refusal), and internal
//! faults.

use std::sync::{MutexGuard, PoisonError, RwLockReadGuard, RwLockWriteGuard};

use crate::handle::{
    AttributeHandle, InteractionClassHandle, ObjectClassHandle, ObjectInstanceHandle,
};

/// Main error type for the federate runtime.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FederateError {
    // Ownership preconditions
    #[error("attribute not owned: {instance} {attribute}")]
    AttributeNotOwned {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    #[error("attribute already being divested: {instance} {attribute}")]
    AttributeAlreadyBeingDivested {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    #[error("attribute divestiture was not requested: {instance} {attribute}")]
    AttributeDivestitureWasNotRequested {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    #[error("attribute already being acquired: {instance} {attribute}")]
    AttributeAlreadyBeingAcquired {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    #[error("attribute acquisition was not requested: {instance} {attribute}")]
    AttributeAcquisitionWasNotRequested {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    #[error("attribute already owned: {instance} {attribute}")]
    AttributeAlreadyOwned {
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
    #[error("attribute not published: {class} {attribute}")]
    AttributeNotPublished {
        class: ObjectClassHandle,
        attribute: AttributeHandle,
    },
    #[error("federate owns attributes of {instance}")]
    FederateOwnsAttributes { instance: ObjectInstanceHandle },
    #[error("ownership acquisition pending on {instance}")]
    OwnershipAcquisitionPending { instance: ObjectInstanceHandle },
    #[error("delete privilege not held for {instance}")]
    DeletePrivilegeNotHeld { instance: ObjectInstanceHandle },

    // Directory preconditions
    #[error("object instance not known: {0}")]
    ObjectInstanceNotKnown(String),
    #[error("object class not published: {0}")]
    ObjectClassNotPublished(ObjectClassHandle),
    #[error("interaction class not published: {0}")]
    InteractionClassNotPublished(InteractionClassHandle),

    // Name reservation preconditions
    #[error("object instance name not reserved: {0}")]
    NameNotReserved(String),
    #[error("object instance name in use: {0}")]
    NameInUse(String),
    #[error("object instance name already being reserved: {0}")]
    NameAlreadyBeingReserved(String),
    #[error("object instance name retired: {0}")]
    NameRetired(String),

    // Definition errors (the FOM is authoritative)
    #[error("attribute not defined: {class} {attribute}")]
    AttributeNotDefined {
        class: ObjectClassHandle,
        attribute: AttributeHandle,
    },
    #[error("object class not defined: {0}")]
    ObjectClassNotDefined(ObjectClassHandle),

    // Communication failures
    #[error("request timed out: {0}")]
    RequestTimeout(String),
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    // Internal faults
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("snapshot encode failed: {0}")]
    SnapshotEncode(String),
    #[error("snapshot decode failed: {0}")]
    SnapshotDecode(String),
    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    SnapshotVersionMismatch { expected: u8, found: u8 },
}

/// Type alias for results in the federate runtime.
pub type FederateResult<T> = Result<T, FederateError>;

// A poisoned lock means another thread panicked while holding it; the
// directory treats that as a recoverable fault on this one call rather than
// propagating the panic.

impl<T> From<PoisonError<MutexGuard<'_, T>>> for FederateError {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        FederateError::LockPoisoned("mutex".to_string())
    }
}

impl<T> From<PoisonError<RwLockReadGuard<'_, T>>> for FederateError {
    fn from(_: PoisonError<RwLockReadGuard<'_, T>>) -> Self {
        FederateError::LockPoisoned("rwlock_read".to_string())
    }
}

impl<T> From<PoisonError<RwLockWriteGuard<'_, T>>> for FederateError {
    fn from(_: PoisonError<RwLockWriteGuard<'_, T>>) -> Self {
        FederateError::LockPoisoned("rwlock_write".to_string())
    }
}
