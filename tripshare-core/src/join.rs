use chrono::{DateTime, Utc};
use serde::Serialize;
use tripshare_shared::SeatUpdateEvent;
use uuid::Uuid;

use crate::seats::SeatLedger;
use crate::trip::Trip;
use crate::{CoreError, CoreResult};

/// State read under the trip lock before a join is admitted.
#[derive(Debug, Clone, Copy)]
pub struct JoinSnapshot<'a> {
    pub trip: &'a Trip,
    pub ledger: Option<&'a SeatLedger>,
    pub joined_count: i32,
    pub already_joined: bool,
}

/// Everything a store writes when a join is admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub ledger: SeatLedger,
    pub total_seats: i32,
    pub seats_remaining: i32,
    /// The stored ledger disagreed with the join registry and was rebased.
    pub rebased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinReceipt {
    pub trip_id: Uuid,
    pub user_id: String,
    pub ledger: SeatLedger,
    pub joined_at: DateTime<Utc>,
}

impl JoinReceipt {
    pub fn to_event(&self) -> SeatUpdateEvent {
        SeatUpdateEvent {
            trip_id: self.trip_id,
            user_id: self.user_id.clone(),
            max_capacity: self.ledger.max_capacity,
            people_already: self.ledger.people_already,
            people_needed: self.ledger.people_needed,
            occurred_at: self.joined_at.timestamp(),
        }
    }
}

/// Decides whether `user_id` may take a seat and what the counters become.
///
/// Must be evaluated while the caller holds the trip's lock, and the plan
/// must be written in the same unit as the join record.
pub fn plan_join(snapshot: JoinSnapshot<'_>, user_id: &str) -> CoreResult<JoinPlan> {
    let trip = snapshot.trip;

    if trip.owner_id == user_id {
        return Err(CoreError::validation("trip_id", "hosts cannot join their own trip"));
    }

    if snapshot.already_joined {
        return Err(CoreError::DuplicateJoin {
            trip_id: trip.id,
            user_id: user_id.to_string(),
        });
    }

    // Missing or drifted ledgers are rebuilt from the registry before the
    // increment so the stored counter never carries old drift forward.
    let capacity = trip.canonical_capacity();
    let base = SeatLedger::derive(trip.id, capacity, trip.occupancy(snapshot.joined_count));
    if base.is_full() {
        return Err(CoreError::CapacityExceeded {
            trip_id: trip.id,
            capacity,
            occupied: base.people_already,
        });
    }

    let rebased = snapshot.ledger.is_some_and(|stored| *stored != base);
    let ledger = base.increment_join();

    Ok(JoinPlan {
        ledger,
        total_seats: capacity,
        seats_remaining: ledger.people_needed,
        rebased,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trip(vehicle: &str, explicit_capacity: Option<i32>) -> Trip {
        let now = Utc::now();
        Trip {
            id: Uuid::new_v4(),
            owner_id: "host".to_string(),
            destination: "Manali".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
            vehicle: vehicle.to_string(),
            explicit_capacity,
            reserved_seats: 0,
            total_seats: explicit_capacity.unwrap_or(4),
            seats_remaining: explicit_capacity.unwrap_or(4),
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot<'a>(
        trip: &'a Trip,
        ledger: Option<&'a SeatLedger>,
        joined_count: i32,
    ) -> JoinSnapshot<'a> {
        JoinSnapshot {
            trip,
            ledger,
            joined_count,
            already_joined: false,
        }
    }

    #[test]
    fn test_admits_and_increments() {
        let t = trip("Mini Van", None);
        let ledger = SeatLedger::derive(t.id, 4, 2);

        let plan = plan_join(snapshot(&t, Some(&ledger), 2), "rider").unwrap();
        assert_eq!(plan.ledger.people_already, 3);
        assert_eq!(plan.ledger.people_needed, 1);
        assert_eq!(plan.seats_remaining, 1);
        assert_eq!(plan.total_seats, 4);
        assert!(!plan.rebased);
    }

    #[test]
    fn test_synthesizes_missing_ledger() {
        let t = trip("Tata SUV", None);

        let plan = plan_join(snapshot(&t, None, 3), "rider").unwrap();
        assert_eq!(plan.ledger.max_capacity, 7);
        assert_eq!(plan.ledger.people_already, 4);
        assert_eq!(plan.ledger.people_needed, 3);
        assert!(!plan.rebased);
    }

    #[test]
    fn test_rebases_drifted_ledger() {
        let t = trip("Sedan", None);
        let drifted = SeatLedger {
            trip_id: t.id,
            max_capacity: 4,
            people_already: 0,
            people_needed: 4,
        };

        let plan = plan_join(snapshot(&t, Some(&drifted), 2), "rider").unwrap();
        assert!(plan.rebased);
        assert_eq!(plan.ledger.people_already, 3);
    }

    #[test]
    fn test_rejects_duplicate_before_capacity() {
        let t = trip("bike", None);
        let mut snap = snapshot(&t, None, 1);
        snap.already_joined = true;

        match plan_join(snap, "rider") {
            Err(CoreError::DuplicateJoin { user_id, .. }) => assert_eq!(user_id, "rider"),
            other => panic!("expected duplicate join, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_when_full() {
        let t = trip("Sedan", Some(2));

        match plan_join(snapshot(&t, None, 2), "rider") {
            Err(CoreError::CapacityExceeded { capacity, occupied, .. }) => {
                assert_eq!(capacity, 2);
                assert_eq!(occupied, 2);
            }
            other => panic!("expected capacity exceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_seats_count_as_occupied() {
        let mut t = trip("Sedan", Some(3));
        t.reserved_seats = 2;

        assert!(plan_join(snapshot(&t, None, 0), "a").is_ok());
        assert!(matches!(
            plan_join(snapshot(&t, None, 1), "b"),
            Err(CoreError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_host_cannot_join() {
        let t = trip("Sedan", None);
        assert!(matches!(
            plan_join(snapshot(&t, None, 0), "host"),
            Err(CoreError::ValidationError { .. })
        ));
    }
}
