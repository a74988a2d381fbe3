//! Instance name reservation.
//!
//! Three disjoint sets: names with a reservation request in flight, names
//! granted and usable for registration, and names retired by a deleted
//! instance. A retired name is never reused within this federate's view of
//! the federation.

use rustc_hash::FxHashSet;

use crate::error::{FederateError, FederateResult};

/// The federate's name reservation state.
#[derive(Default)]
pub struct ReservationSet {
    being_reserved: FxHashSet<String>,
    reserved: FxHashSet<String>,
    retired: FxHashSet<String>,
}

impl ReservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local validation before any network round trip: fails fast on a
    /// duplicate, in-flight or retired name.
    pub fn check_reservable(&self, name: &str) -> FederateResult<()> {
        if self.being_reserved.contains(name) {
            Err(FederateError::NameAlreadyBeingReserved(name.to_string()))
        } else if self.reserved.contains(name) {
            Err(FederateError::NameInUse(name.to_string()))
        } else if self.retired.contains(name) {
            Err(FederateError::NameRetired(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// Marks a single name as being reserved.
    pub fn begin_reserve(&mut self, name: &str) -> FederateResult<()> {
        self.check_reservable(name)?;
        self.being_reserved.insert(name.to_string());
        Ok(())
    }

    /// Marks a batch of names as being reserved; validates every name before
    /// marking any.
    pub fn begin_reserve_many(&mut self, names: &[String]) -> FederateResult<()> {
        for name in names {
            self.check_reservable(name)?;
        }
        for name in names {
            self.being_reserved.insert(name.clone());
        }
        Ok(())
    }

    /// Applies the coordinator's answer. A success moves the name into the
    /// reserved set; a failure drops it. Unknown names (e.g. after a restore
    /// that predates the request) are ignored.
    pub fn complete(&mut self, name: &str, succeeded: bool) {
        if self.being_reserved.remove(name) && succeeded {
            self.reserved.insert(name.to_string());
        }
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Fails `NameNotReserved` unless the name is in the reserved set.
    pub fn check_reserved(&self, name: &str) -> FederateResult<()> {
        if self.reserved.contains(name) {
            Ok(())
        } else {
            Err(FederateError::NameNotReserved(name.to_string()))
        }
    }

    /// Gives a reserved name back without using it.
    pub fn release(&mut self, name: &str) -> FederateResult<()> {
        if self.reserved.remove(name) {
            Ok(())
        } else {
            Err(FederateError::NameNotReserved(name.to_string()))
        }
    }

    /// Releases a batch of reserved names, all-or-nothing.
    pub fn release_many(&mut self, names: &[String]) -> FederateResult<()> {
        for name in names {
            self.check_reserved(name)?;
        }
        for name in names {
            self.reserved.remove(name);
        }
        Ok(())
    }

    /// Retires a name whose instance has been deleted. The name leaves the
    /// reserved set (if it was there) and can never be reserved again.
    pub fn retire(&mut self, name: &str) {
        self.reserved.remove(name);
        self.retired.insert(name.to_string());
    }

    /// Reserved names, sorted, for the federation snapshot.
    pub fn reserved_entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.reserved.iter().cloned().collect();
        entries.sort();
        entries
    }

    /// In-flight names, sorted, for the federation snapshot.
    pub fn being_reserved_entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.being_reserved.iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Retired names, sorted, for the federation snapshot.
    pub fn retired_entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.retired.iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Replaces all three sets from a federation snapshot.
    pub fn restore(&mut self, reserved: Vec<String>, being_reserved: Vec<String>, retired: Vec<String>) {
        self.reserved = reserved.into_iter().collect();
        self.being_reserved = being_reserved.into_iter().collect();
        self.retired = retired.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_lifecycle() {
        let mut names = ReservationSet::new();
        names.begin_reserve("alpha").expect("fresh name");

        // in flight: a second request and a release both fail
        assert_eq!(
            names.begin_reserve("alpha"),
            Err(FederateError::NameAlreadyBeingReserved("alpha".to_string()))
        );
        assert_eq!(
            names.release("alpha"),
            Err(FederateError::NameNotReserved("alpha".to_string()))
        );

        names.complete("alpha", true);
        assert!(names.is_reserved("alpha"));
        assert_eq!(
            names.begin_reserve("alpha"),
            Err(FederateError::NameInUse("alpha".to_string()))
        );

        names.release("alpha").expect("reserved");
        assert!(!names.is_reserved("alpha"));
    }

    #[test]
    fn failed_reservation_leaves_no_trace() {
        let mut names = ReservationSet::new();
        names.begin_reserve("beta").expect("fresh name");
        names.complete("beta", false);
        assert!(!names.is_reserved("beta"));
        assert!(names.begin_reserve("beta").is_ok());
    }

    #[test]
    fn retired_names_are_never_reused() {
        let mut names = ReservationSet::new();
        names.begin_reserve("gamma").expect("fresh name");
        names.complete("gamma", true);
        names.retire("gamma");

        assert!(!names.is_reserved("gamma"));
        assert_eq!(
            names.begin_reserve("gamma"),
            Err(FederateError::NameRetired("gamma".to_string()))
        );
    }

    #[test]
    fn batch_reservation_is_all_or_nothing() {
        let mut names = ReservationSet::new();
        names.begin_reserve("dup").expect("fresh name");

        let batch = vec!["one".to_string(), "dup".to_string()];
        assert!(names.begin_reserve_many(&batch).is_err());
        // "one" must not have been marked
        assert!(names.begin_reserve("one").is_ok());
    }
}
