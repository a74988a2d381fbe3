//! Per-attribute ownership record.

use serde::{Deserialize, Serialize};

/// Local view of one attribute's ownership.
///
/// `Unowned` has no record — an attribute absent from the tracker map is
/// unowned and has nothing pending. That makes "at most one of owned /
/// acquiring / acquiring-if-available" hold by construction instead of by
/// discipline across separate flag sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipState {
    /// This federate is the sole source of update values.
    Owned,
    /// Owned, with a negotiated divestiture outstanding.
    DivestitureRequested,
    /// Unconditional acquisition requested, no grant yet.
    Acquiring,
    /// Conditional acquisition requested, no grant yet.
    AcquiringIfAvailable,
}

/// One attribute's record in the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOwnershipRecord {
    pub state: OwnershipState,
}

impl AttributeOwnershipRecord {
    pub fn owned() -> Self {
        Self {
            state: OwnershipState::Owned,
        }
    }

    /// Owned in either plain or divesting form.
    pub fn is_owned(&self) -> bool {
        matches!(
            self.state,
            OwnershipState::Owned | OwnershipState::DivestitureRequested
        )
    }

    pub fn is_acquisition_pending(&self) -> bool {
        matches!(
            self.state,
            OwnershipState::Acquiring | OwnershipState::AcquiringIfAvailable
        )
    }

    pub fn is_divesting(&self) -> bool {
        self.state == OwnershipState::DivestitureRequested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divesting_still_counts_as_owned() {
        let record = AttributeOwnershipRecord {
            state: OwnershipState::DivestitureRequested,
        };
        assert!(record.is_owned());
        assert!(record.is_divesting());
        assert!(!record.is_acquisition_pending());
    }
}
