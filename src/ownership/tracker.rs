//! The per-instance ownership state machine.
//!
//! Batch operations name a set of attributes; the contract is all-or-nothing,
//! so every method validates the full set before mutating any record. A
//! validation failure leaves the tracker exactly as it was.

use rustc_hash::FxHashMap;

use crate::error::{FederateError, FederateResult};
use crate::handle::{AttributeHandle, AttributeHandleSet, ObjectInstanceHandle};
use crate::ownership::record::{AttributeOwnershipRecord, OwnershipState};

/// Ownership records for one object instance.
#[derive(Clone, Debug)]
pub struct OwnershipTracker {
    instance: ObjectInstanceHandle,
    records: FxHashMap<AttributeHandle, AttributeOwnershipRecord>,
}

impl OwnershipTracker {
    /// Empty tracker — the local view of a discovered instance.
    pub fn new(instance: ObjectInstanceHandle) -> Self {
        Self {
            instance,
            records: FxHashMap::default(),
        }
    }

    /// Tracker owning `attributes` outright — the local view of a freshly
    /// registered instance.
    pub fn owning(
        instance: ObjectInstanceHandle,
        attributes: impl IntoIterator<Item = AttributeHandle>,
    ) -> Self {
        let mut tracker = Self::new(instance);
        for attribute in attributes {
            tracker
                .records
                .insert(attribute, AttributeOwnershipRecord::owned());
        }
        tracker
    }

    pub fn state(&self, attribute: AttributeHandle) -> Option<OwnershipState> {
        self.records.get(&attribute).map(|record| record.state)
    }

    pub fn owns(&self, attribute: AttributeHandle) -> bool {
        self.records
            .get(&attribute)
            .map(|record| record.is_owned())
            .unwrap_or(false)
    }

    pub fn owns_any(&self, attributes: &AttributeHandleSet) -> bool {
        attributes.iter().any(|attribute| self.owns(*attribute))
    }

    /// Currently owned handles, sorted for deterministic output.
    pub fn owned_handles(&self) -> Vec<AttributeHandle> {
        let mut handles: Vec<AttributeHandle> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_owned())
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort();
        handles
    }

    /// All records, sorted by handle, for the federation snapshot.
    pub fn records(&self) -> Vec<(AttributeHandle, AttributeOwnershipRecord)> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .map(|(handle, record)| (*handle, *record))
            .collect();
        records.sort_by_key(|(handle, _)| *handle);
        records
    }

    pub fn from_records(
        instance: ObjectInstanceHandle,
        records: impl IntoIterator<Item = (AttributeHandle, AttributeOwnershipRecord)>,
    ) -> Self {
        Self {
            instance,
            records: records.into_iter().collect(),
        }
    }

    // --- divestiture ---

    /// Unconditional divestiture: every attribute must be owned; afterwards
    /// none is. Divesting an attribute mid-negotiation implicitly abandons
    /// the negotiation.
    pub fn divest_unconditional(&mut self, attributes: &[AttributeHandle]) -> FederateResult<()> {
        self.check_all_owned(attributes)?;
        for attribute in attributes {
            self.records.remove(attribute);
        }
        Ok(())
    }

    /// Drops ownership without precondition checks. Used by the cascading
    /// unpublish path, which has already validated every instance.
    pub fn divest_unchecked(&mut self, attributes: &AttributeHandleSet) {
        self.records
            .retain(|handle, _| !attributes.contains(handle));
    }

    pub fn begin_negotiated_divestiture(
        &mut self,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        for attribute in attributes {
            match self.state(*attribute) {
                Some(OwnershipState::Owned) => {}
                Some(OwnershipState::DivestitureRequested) => {
                    return Err(FederateError::AttributeAlreadyBeingDivested {
                        instance: self.instance,
                        attribute: *attribute,
                    })
                }
                _ => {
                    return Err(FederateError::AttributeNotOwned {
                        instance: self.instance,
                        attribute: *attribute,
                    })
                }
            }
        }
        for attribute in attributes {
            if let Some(record) = self.records.get_mut(attribute) {
                record.state = OwnershipState::DivestitureRequested;
            }
        }
        Ok(())
    }

    pub fn cancel_negotiated_divestiture(
        &mut self,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        self.check_all_divesting(attributes)?;
        for attribute in attributes {
            if let Some(record) = self.records.get_mut(attribute) {
                record.state = OwnershipState::Owned;
            }
        }
        Ok(())
    }

    /// Confirms a negotiated divestiture: the attributes leave the owned set.
    pub fn confirm_divestiture(&mut self, attributes: &[AttributeHandle]) -> FederateResult<()> {
        self.check_all_divesting(attributes)?;
        for attribute in attributes {
            self.records.remove(attribute);
        }
        Ok(())
    }

    // --- acquisition ---

    /// Unconditional acquisition request. Re-requesting an attribute already
    /// being acquired is permitted (the coordinator deduplicates); a
    /// conditional request in flight is upgraded to unconditional.
    pub fn begin_acquisition(&mut self, attributes: &[AttributeHandle]) -> FederateResult<()> {
        for attribute in attributes {
            if self.owns(*attribute) {
                return Err(FederateError::FederateOwnsAttributes {
                    instance: self.instance,
                });
            }
        }
        for attribute in attributes {
            self.records.insert(
                *attribute,
                AttributeOwnershipRecord {
                    state: OwnershipState::Acquiring,
                },
            );
        }
        Ok(())
    }

    pub fn begin_acquisition_if_available(
        &mut self,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        for attribute in attributes {
            match self.state(*attribute) {
                None => {}
                Some(OwnershipState::Acquiring) | Some(OwnershipState::AcquiringIfAvailable) => {
                    return Err(FederateError::AttributeAlreadyBeingAcquired {
                        instance: self.instance,
                        attribute: *attribute,
                    })
                }
                Some(_) => {
                    return Err(FederateError::FederateOwnsAttributes {
                        instance: self.instance,
                    })
                }
            }
        }
        for attribute in attributes {
            self.records.insert(
                *attribute,
                AttributeOwnershipRecord {
                    state: OwnershipState::AcquiringIfAvailable,
                },
            );
        }
        Ok(())
    }

    pub fn cancel_acquisition(&mut self, attributes: &[AttributeHandle]) -> FederateResult<()> {
        for attribute in attributes {
            match self.state(*attribute) {
                Some(OwnershipState::Acquiring) | Some(OwnershipState::AcquiringIfAvailable) => {}
                Some(_) => {
                    // the grant arrived before the cancel
                    return Err(FederateError::AttributeAlreadyOwned {
                        instance: self.instance,
                        attribute: *attribute,
                    });
                }
                None => {
                    return Err(FederateError::AttributeAcquisitionWasNotRequested {
                        instance: self.instance,
                        attribute: *attribute,
                    })
                }
            }
        }
        for attribute in attributes {
            self.records.remove(attribute);
        }
        Ok(())
    }

    /// Applies a coordinator grant. Idempotent: attributes already owned are
    /// left alone.
    pub fn grant(&mut self, attributes: &[AttributeHandle]) {
        for attribute in attributes {
            self.records
                .insert(*attribute, AttributeOwnershipRecord::owned());
        }
    }

    /// Commits the coordinator-confirmed subset of a release-if-wanted
    /// round trip. Returns what was actually released; attributes the
    /// federate no longer owned (raced by another divestiture while the
    /// request was in flight) are skipped.
    pub fn commit_release(&mut self, attributes: &[AttributeHandle]) -> Vec<AttributeHandle> {
        let mut released = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            if self.owns(*attribute) {
                self.records.remove(attribute);
                released.push(*attribute);
            }
        }
        released
    }

    // --- cross-cutting checks ---

    /// Fails if any acquisition is in flight. Blocks resignation, unpublish
    /// and local delete.
    pub fn check_acquisition_pending(&self) -> FederateResult<()> {
        if self
            .records
            .values()
            .any(|record| record.is_acquisition_pending())
        {
            Err(FederateError::OwnershipAcquisitionPending {
                instance: self.instance,
            })
        } else {
            Ok(())
        }
    }

    /// Fails if an acquisition is in flight for any of `attributes`.
    pub fn check_acquisition_pending_among(
        &self,
        attributes: &AttributeHandleSet,
    ) -> FederateResult<()> {
        for attribute in attributes {
            if let Some(record) = self.records.get(attribute) {
                if record.is_acquisition_pending() {
                    return Err(FederateError::OwnershipAcquisitionPending {
                        instance: self.instance,
                    });
                }
            }
        }
        Ok(())
    }

    /// Fails if this federate owns anything at all (including the delete
    /// privilege).
    pub fn check_owns_none(&self) -> FederateResult<()> {
        if self.records.values().any(|record| record.is_owned()) {
            Err(FederateError::FederateOwnsAttributes {
                instance: self.instance,
            })
        } else {
            Ok(())
        }
    }

    /// Fails if this federate owns any attribute other than the delete
    /// privilege. The resign mode that deletes owned objects needs the
    /// privilege to do so.
    pub fn check_owns_none_besides(&self, delete_privilege: AttributeHandle) -> FederateResult<()> {
        if self
            .records
            .iter()
            .any(|(handle, record)| record.is_owned() && *handle != delete_privilege)
        {
            Err(FederateError::FederateOwnsAttributes {
                instance: self.instance,
            })
        } else {
            Ok(())
        }
    }

    /// Fails unless every attribute is owned.
    pub fn check_all_owned(&self, attributes: &[AttributeHandle]) -> FederateResult<()> {
        for attribute in attributes {
            if !self.owns(*attribute) {
                return Err(FederateError::AttributeNotOwned {
                    instance: self.instance,
                    attribute: *attribute,
                });
            }
        }
        Ok(())
    }

    fn check_all_divesting(&self, attributes: &[AttributeHandle]) -> FederateResult<()> {
        for attribute in attributes {
            match self.state(*attribute) {
                Some(OwnershipState::DivestitureRequested) => {}
                Some(OwnershipState::Owned) => {
                    return Err(FederateError::AttributeDivestitureWasNotRequested {
                        instance: self.instance,
                        attribute: *attribute,
                    })
                }
                _ => {
                    return Err(FederateError::AttributeNotOwned {
                        instance: self.instance,
                        attribute: *attribute,
                    })
                }
            }
        }
        Ok(())
    }
}
