use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cached per-trip seat counters.
///
/// `people_needed` is always `max_capacity - people_already` clamped at zero,
/// so the triple only stops adding up when a trip is over-occupied (for
/// example after reconciliation shrank its capacity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLedger {
    pub trip_id: Uuid,
    pub max_capacity: i32,
    pub people_already: i32,
    pub people_needed: i32,
}

impl SeatLedger {
    pub fn derive(trip_id: Uuid, max_capacity: i32, people_already: i32) -> Self {
        Self {
            trip_id,
            max_capacity,
            people_already,
            people_needed: (max_capacity - people_already).max(0),
        }
    }

    /// One more confirmed rider.
    pub fn increment_join(&self) -> Self {
        Self::derive(self.trip_id, self.max_capacity, self.people_already + 1)
    }

    pub fn is_full(&self) -> bool {
        self.people_already >= self.max_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_until_full() {
        let mut ledger = SeatLedger::derive(Uuid::new_v4(), 3, 0);
        assert_eq!(ledger.people_needed, 3);

        for n in 1..=3 {
            ledger = ledger.increment_join();
            assert_eq!(ledger.people_already, n);
            assert_eq!(ledger.people_needed, 3 - n);
            assert_eq!(ledger.people_already + ledger.people_needed, 3);
        }
        assert!(ledger.is_full());
    }

    #[test]
    fn test_needed_never_negative() {
        let ledger = SeatLedger::derive(Uuid::new_v4(), 2, 5);
        assert_eq!(ledger.people_needed, 0);
        assert!(ledger.is_full());
        assert_eq!(ledger.increment_join().people_needed, 0);
    }
}
