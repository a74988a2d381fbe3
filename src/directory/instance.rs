//! One known object instance.

use crate::error::{FederateError, FederateResult};
use crate::handle::{
    AttributeHandle, FederateHandle, ObjectClassHandle, ObjectInstanceHandle,
};
use crate::ownership::OwnershipTracker;

/// The federate's view of one object instance.
///
/// Handle, name and class are fixed for the instance's lifetime; all mutable
/// state lives in the ownership tracker.
#[derive(Clone, Debug)]
pub struct ObjectInstance {
    handle: ObjectInstanceHandle,
    name: String,
    class: ObjectClassHandle,
    producer: FederateHandle,
    ownership: OwnershipTracker,
}

impl ObjectInstance {
    /// A locally registered instance: the creator owns every published
    /// attribute plus the delete privilege.
    pub fn registered(
        handle: ObjectInstanceHandle,
        name: String,
        class: ObjectClassHandle,
        producer: FederateHandle,
        owned: impl IntoIterator<Item = AttributeHandle>,
    ) -> Self {
        Self {
            handle,
            name,
            class,
            producer,
            ownership: OwnershipTracker::owning(handle, owned),
        }
    }

    /// A remotely discovered instance: nothing is owned locally.
    pub fn discovered(
        handle: ObjectInstanceHandle,
        name: String,
        class: ObjectClassHandle,
        producer: FederateHandle,
    ) -> Self {
        Self {
            handle,
            name,
            class,
            producer,
            ownership: OwnershipTracker::new(handle),
        }
    }

    /// Rebuilt from a federation snapshot.
    pub fn restored(
        handle: ObjectInstanceHandle,
        name: String,
        class: ObjectClassHandle,
        producer: FederateHandle,
        ownership: OwnershipTracker,
    ) -> Self {
        Self {
            handle,
            name,
            class,
            producer,
            ownership,
        }
    }

    pub fn handle(&self) -> ObjectInstanceHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ObjectClassHandle {
        self.class
    }

    pub fn producer(&self) -> FederateHandle {
        self.producer
    }

    pub fn ownership(&self) -> &OwnershipTracker {
        &self.ownership
    }

    pub fn ownership_mut(&mut self) -> &mut OwnershipTracker {
        &mut self.ownership
    }

    /// Only the holder of the delete privilege may delete the instance.
    pub fn check_delete_privilege(&self, delete_privilege: AttributeHandle) -> FederateResult<()> {
        if self.ownership.owns(delete_privilege) {
            Ok(())
        } else {
            Err(FederateError::DeletePrivilegeNotHeld {
                instance: self.handle,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_instances_own_their_attributes() {
        let handle = ObjectInstanceHandle::new(FederateHandle(1), 1);
        let instance = ObjectInstance::registered(
            handle,
            "probe-1".to_string(),
            ObjectClassHandle(7),
            FederateHandle(1),
            [AttributeHandle(0), AttributeHandle(3)],
        );
        assert!(instance.ownership().owns(AttributeHandle(3)));
        assert!(instance.check_delete_privilege(AttributeHandle(0)).is_ok());
    }

    #[test]
    fn discovered_instances_own_nothing() {
        let handle = ObjectInstanceHandle::new(FederateHandle(2), 9);
        let instance = ObjectInstance::discovered(
            handle,
            "probe-9".to_string(),
            ObjectClassHandle(7),
            FederateHandle(2),
        );
        assert!(instance.ownership().owned_handles().is_empty());
        assert_eq!(
            instance.check_delete_privilege(AttributeHandle(0)),
            Err(FederateError::DeletePrivilegeNotHeld { instance: handle })
        );
    }
}
