//! Handle types for federation-wide entities.
//!
//! Handles are opaque identifiers assigned elsewhere (object class,
//! attribute and interaction class handles come from the FOM; federate
//! handles from the coordinator at join time). Object instance handles are
//! the exception: they combine the registering federate's own handle with a
//! per-federate serial so every federate can mint globally unique handles
//! without a round trip.

use serde::{Deserialize, Serialize};
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

/// Handle for an object class defined in the FOM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectClassHandle(pub u32);

/// Handle for an attribute of an object class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeHandle(pub u32);

/// Handle for an interaction class defined in the FOM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InteractionClassHandle(pub u32);

/// Handle for a parameter of an interaction class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterHandle(pub u32);

/// Handle for a joined federate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FederateHandle(pub u32);

/// Handle for one object instance in the federation.
///
/// The `(federate, serial)` pair is globally unique as long as each
/// federate only ever increments its own serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectInstanceHandle {
    federate: FederateHandle,
    serial: u64,
}

impl ObjectInstanceHandle {
    pub fn new(federate: FederateHandle, serial: u64) -> Self {
        Self { federate, serial }
    }

    /// The federate that registered this instance.
    pub fn federate(&self) -> FederateHandle {
        self.federate
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for ObjectClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

impl fmt::Display for AttributeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr#{}", self.0)
    }
}

impl fmt::Display for InteractionClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interaction#{}", self.0)
    }
}

impl fmt::Display for FederateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "federate#{}", self.0)
    }
}

impl fmt::Display for ObjectInstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}.{}", self.federate.0, self.serial)
    }
}

/// Set of attribute handles, as named in batch operations.
pub type AttributeHandleSet = FxHashSet<AttributeHandle>;

/// Attribute values carried opaquely through update/reflect paths.
pub type AttributeValueMap = FxHashMap<AttributeHandle, Vec<u8>>;

/// Interaction parameter values, equally opaque.
pub type ParameterValueMap = FxHashMap<ParameterHandle, Vec<u8>>;
