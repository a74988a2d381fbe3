//! Lock-order enforcement.
//!
//! The runtime's locks must be taken in a fixed order when more than one is
//! held: publication → subscription → directory → instance → reservation.
//! Violations deadlock only under contention, which review rarely catches,
//! so debug builds track each thread's held ranks and assert the order on
//! every acquisition. Release builds compile the tracker down to nothing.

#[cfg(debug_assertions)]
use std::cell::RefCell;

/// Ranks in required acquisition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum LockRank {
    Publication = 0,
    Subscription = 1,
    Directory = 2,
    Instance = 3,
    Reservation = 4,
}

#[cfg(debug_assertions)]
thread_local! {
    static HELD: RefCell<Vec<LockRank>> = const { RefCell::new(Vec::new()) };
}

/// Token for one acquisition; dropping it releases the rank.
///
/// Acquire the token immediately before the lock and keep it alongside the
/// guard.
pub(crate) struct RankToken {
    #[cfg(debug_assertions)]
    rank: LockRank,
}

/// Records that the current thread is about to take a lock of `rank`.
///
/// Panics in debug builds when a lock of equal or higher rank is already
/// held by this thread.
pub(crate) fn enter(rank: LockRank) -> RankToken {
    #[cfg(debug_assertions)]
    HELD.with(|held| {
        let mut held = held.borrow_mut();
        if let Some(top) = held.last() {
            assert!(
                rank > *top,
                "lock order violation: acquiring {:?} while holding {:?}",
                rank,
                top
            );
        }
        held.push(rank);
    });
    #[cfg(not(debug_assertions))]
    let _ = rank;
    RankToken {
        #[cfg(debug_assertions)]
        rank,
    }
}

#[cfg(debug_assertions)]
impl Drop for RankToken {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            let top = held.pop();
            debug_assert_eq!(top, Some(self.rank));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_acquisition_is_fine() {
        let _publication = enter(LockRank::Publication);
        let _directory = enter(LockRank::Directory);
        let _reservation = enter(LockRank::Reservation);
    }

    #[test]
    fn reacquisition_after_release_is_fine() {
        {
            let _directory = enter(LockRank::Directory);
        }
        let _publication = enter(LockRank::Publication);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "lock order violation")]
    fn out_of_order_acquisition_panics_in_debug() {
        let _reservation = enter(LockRank::Reservation);
        let _directory = enter(LockRank::Directory);
    }
}
