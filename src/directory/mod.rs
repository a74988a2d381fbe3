//! The object instance directory.
//!
//! Three indices over the same set of instances (`by_handle`, `by_name`,
//! `by_class`) plus a tombstone set for handles that have been removed, so a
//! late remote event for a dead instance can be told apart from one for an
//! instance we never knew. Structural mutations touch all indices together;
//! the caller holds the directory write lock across the whole mutation.
//!
//! Each instance sits behind its own `RwLock` so per-instance ownership
//! transitions serialize while distinct instances proceed concurrently under
//! a directory read lock.

pub mod instance;

pub use instance::ObjectInstance;

use std::sync::{Arc, RwLock};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{FederateError, FederateResult};
use crate::handle::{FederateHandle, ObjectClassHandle, ObjectInstanceHandle};

/// Shared handle to one directory entry.
pub type SharedInstance = Arc<RwLock<ObjectInstance>>;

/// All object instances this federate currently knows about.
#[derive(Default)]
pub struct Directory {
    by_handle: FxHashMap<ObjectInstanceHandle, SharedInstance>,
    by_name: FxHashMap<String, ObjectInstanceHandle>,
    by_class: FxHashMap<ObjectClassHandle, FxHashSet<ObjectInstanceHandle>>,
    removed: FxHashSet<ObjectInstanceHandle>,
    next_serial: u64,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next instance handle for this federate. Caller must hold
    /// the directory write lock so the bump and the insert commit together.
    pub fn allocate_handle(&mut self, federate: FederateHandle) -> ObjectInstanceHandle {
        self.next_serial += 1;
        ObjectInstanceHandle::new(federate, self.next_serial)
    }

    pub fn next_serial(&self) -> u64 {
        self.next_serial
    }

    /// Resumes the serial counter from a snapshot. Never moves backwards.
    pub fn resume_serial(&mut self, serial: u64) {
        self.next_serial = self.next_serial.max(serial);
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    /// Inserts a new instance into all three indices.
    pub fn insert(&mut self, instance: ObjectInstance) -> SharedInstance {
        let handle = instance.handle();
        let name = instance.name().to_string();
        let class = instance.class();

        let shared = Arc::new(RwLock::new(instance));
        self.by_handle.insert(handle, Arc::clone(&shared));
        self.by_name.insert(name, handle);
        self.by_class.entry(class).or_default().insert(handle);
        shared
    }

    /// Removes an instance from all three indices, leaving a tombstone.
    /// Returns the entry and its name, or `None` for an unknown handle.
    pub fn remove(&mut self, handle: ObjectInstanceHandle) -> Option<(SharedInstance, String)> {
        let shared = self.by_handle.remove(&handle)?;
        let (name, class) = match shared.read() {
            Ok(instance) => (instance.name().to_string(), instance.class()),
            Err(poisoned) => {
                let instance = poisoned.into_inner();
                (instance.name().to_string(), instance.class())
            }
        };
        self.by_name.remove(&name);
        if let Some(handles) = self.by_class.get_mut(&class) {
            handles.remove(&handle);
            if handles.is_empty() {
                self.by_class.remove(&class);
            }
        }
        self.removed.insert(handle);
        Some((shared, name))
    }

    /// Removes without leaving a tombstone — for local deletes, where the
    /// instance still exists federation-wide and may be rediscovered.
    pub fn remove_local(
        &mut self,
        handle: ObjectInstanceHandle,
    ) -> Option<(SharedInstance, String)> {
        let removed = self.remove(handle);
        if removed.is_some() {
            self.removed.remove(&handle);
        }
        removed
    }

    pub fn get(&self, handle: ObjectInstanceHandle) -> FederateResult<SharedInstance> {
        self.by_handle
            .get(&handle)
            .cloned()
            .ok_or_else(|| FederateError::ObjectInstanceNotKnown(handle.to_string()))
    }

    pub fn get_by_name(&self, name: &str) -> FederateResult<SharedInstance> {
        let handle = self
            .by_name
            .get(name)
            .ok_or_else(|| FederateError::ObjectInstanceNotKnown(name.to_string()))?;
        self.get(*handle)
    }

    pub fn contains(&self, handle: ObjectInstanceHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn was_removed(&self, handle: ObjectInstanceHandle) -> bool {
        self.removed.contains(&handle)
    }

    /// Handles of every known instance registered or discovered as `class`,
    /// sorted for deterministic iteration.
    pub fn handles_of_class(&self, class: ObjectClassHandle) -> Vec<ObjectInstanceHandle> {
        let mut handles: Vec<ObjectInstanceHandle> = self
            .by_class
            .get(&class)
            .map(|handles| handles.iter().copied().collect())
            .unwrap_or_default();
        handles.sort();
        handles
    }

    /// Every entry, sorted by handle.
    pub fn entries(&self) -> Vec<SharedInstance> {
        let mut handles: Vec<ObjectInstanceHandle> = self.by_handle.keys().copied().collect();
        handles.sort();
        handles
            .into_iter()
            .filter_map(|handle| self.by_handle.get(&handle).cloned())
            .collect()
    }

    /// Index contents for snapshot comparison: `(handle, name, class)` per
    /// instance, sorted by handle.
    pub fn index_contents(&self) -> Vec<(ObjectInstanceHandle, String, ObjectClassHandle)> {
        let mut contents: Vec<_> = self
            .by_handle
            .values()
            .map(|shared| {
                let instance = shared.read().unwrap_or_else(|poisoned| poisoned.into_inner());
                (instance.handle(), instance.name().to_string(), instance.class())
            })
            .collect();
        contents.sort_by_key(|(handle, _, _)| *handle);
        contents
    }

    /// Drops every entry and tombstone ahead of a snapshot restore.
    pub fn clear(&mut self) {
        self.by_handle.clear();
        self.by_name.clear();
        self.by_class.clear();
        self.removed.clear();
        self.next_serial = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AttributeHandle;

    fn directory_with_one(class: ObjectClassHandle) -> (Directory, ObjectInstanceHandle) {
        let mut directory = Directory::new();
        let handle = directory.allocate_handle(FederateHandle(1));
        directory.insert(ObjectInstance::registered(
            handle,
            format!("OBJ-{}", handle.serial()),
            class,
            FederateHandle(1),
            [AttributeHandle(0)],
        ));
        (directory, handle)
    }

    #[test]
    fn insert_populates_all_three_indices() {
        let class = ObjectClassHandle(4);
        let (directory, handle) = directory_with_one(class);

        assert!(directory.get(handle).is_ok());
        assert!(directory.get_by_name("OBJ-1").is_ok());
        assert_eq!(directory.handles_of_class(class), vec![handle]);
    }

    #[test]
    fn remove_purges_all_three_indices_and_leaves_a_tombstone() {
        let class = ObjectClassHandle(4);
        let (mut directory, handle) = directory_with_one(class);

        let (_, name) = directory.remove(handle).expect("known");
        assert_eq!(name, "OBJ-1");
        assert!(directory.get(handle).is_err());
        assert!(directory.get_by_name("OBJ-1").is_err());
        assert!(directory.handles_of_class(class).is_empty());
        assert!(directory.was_removed(handle));

        // removing again is a miss, not a panic
        assert!(directory.remove(handle).is_none());
    }

    #[test]
    fn local_remove_leaves_no_tombstone() {
        let (mut directory, handle) = directory_with_one(ObjectClassHandle(4));
        directory.remove_local(handle).expect("known");
        assert!(!directory.was_removed(handle));
    }

    #[test]
    fn handle_allocation_is_monotonic_and_resumable() {
        let mut directory = Directory::new();
        let first = directory.allocate_handle(FederateHandle(3));
        let second = directory.allocate_handle(FederateHandle(3));
        assert!(second.serial() > first.serial());

        directory.resume_serial(10);
        assert_eq!(directory.allocate_handle(FederateHandle(3)).serial(), 11);
        // resuming backwards is ignored
        directory.resume_serial(4);
        assert_eq!(directory.allocate_handle(FederateHandle(3)).serial(), 12);
    }

    #[test]
    fn lookup_misses_name_the_key() {
        let directory = Directory::new();
        let missing = ObjectInstanceHandle::new(FederateHandle(9), 9);
        let err = directory.get(missing).err().expect("lookup must miss");
        assert_eq!(
            err,
            FederateError::ObjectInstanceNotKnown("object#9.9".to_string())
        );
    }
}
