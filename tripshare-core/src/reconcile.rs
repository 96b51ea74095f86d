use serde::Serialize;
use uuid::Uuid;

use crate::capacity::{resolve_default_capacity, CapacityPolicy};
use crate::seats::SeatLedger;
use crate::trip::Trip;

/// Recomputed seat state for one trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripReconciliation {
    pub trip_id: Uuid,
    pub explicit_capacity: Option<i32>,
    pub total_seats: i32,
    pub seats_remaining: i32,
    pub ledger: SeatLedger,
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub updated_count: usize,
    pub total_count: usize,
    pub updated_trip_ids: Vec<Uuid>,
}

impl ReconcileReport {
    pub fn record(&mut self, outcome: &TripReconciliation) {
        self.total_count += 1;
        if outcome.changed {
            self.updated_count += 1;
            self.updated_trip_ids.push(outcome.trip_id);
        }
    }
}

/// Rebuilds a trip's counters from its join count. `changed` is false when
/// the stored trip fields and ledger already match.
pub fn plan_reconciliation(
    trip: &Trip,
    stored: Option<&SeatLedger>,
    joined_count: i32,
    policy: CapacityPolicy,
) -> TripReconciliation {
    let (explicit_capacity, capacity) = match policy {
        CapacityPolicy::PreserveExplicit => (trip.explicit_capacity, trip.canonical_capacity()),
        CapacityPolicy::VehicleDefault => (None, resolve_default_capacity(&trip.vehicle)),
    };

    let ledger = SeatLedger::derive(trip.id, capacity, trip.occupancy(joined_count));
    let seats_remaining = ledger.people_needed;

    let changed = explicit_capacity != trip.explicit_capacity
        || capacity != trip.total_seats
        || seats_remaining != trip.seats_remaining
        || stored != Some(&ledger);

    TripReconciliation {
        trip_id: trip.id,
        explicit_capacity,
        total_seats: capacity,
        seats_remaining,
        ledger,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn trip(vehicle: &str, explicit_capacity: Option<i32>, total: i32, remaining: i32) -> Trip {
        let now = Utc::now();
        Trip {
            id: Uuid::new_v4(),
            owner_id: "host".to_string(),
            destination: "Pondicherry".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 10, 30).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            vehicle: vehicle.to_string(),
            explicit_capacity,
            reserved_seats: 0,
            total_seats: total,
            seats_remaining: remaining,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_consistent_trip_unchanged() {
        let t = trip("Mini Van", None, 4, 2);
        let ledger = SeatLedger::derive(t.id, 4, 2);

        let outcome = plan_reconciliation(&t, Some(&ledger), 2, CapacityPolicy::PreserveExplicit);
        assert!(!outcome.changed);
        assert_eq!(outcome.ledger, ledger);
    }

    #[test]
    fn test_drifted_legacy_fields_healed() {
        let t = trip("Volvo bus", None, 4, 4);
        let ledger = SeatLedger::derive(t.id, 15, 3);

        let outcome = plan_reconciliation(&t, Some(&ledger), 3, CapacityPolicy::PreserveExplicit);
        assert!(outcome.changed);
        assert_eq!(outcome.total_seats, 15);
        assert_eq!(outcome.seats_remaining, 12);
    }

    #[test]
    fn test_missing_ledger_counts_as_change() {
        let t = trip("bike", None, 1, 1);

        let outcome = plan_reconciliation(&t, None, 0, CapacityPolicy::PreserveExplicit);
        assert!(outcome.changed);
        assert_eq!(outcome.ledger.max_capacity, 1);
    }

    #[test]
    fn test_explicit_capacity_kept_by_default() {
        let t = trip("Sedan", Some(10), 10, 9);
        let ledger = SeatLedger::derive(t.id, 10, 1);

        let outcome = plan_reconciliation(&t, Some(&ledger), 1, CapacityPolicy::PreserveExplicit);
        assert!(!outcome.changed);
        assert_eq!(outcome.total_seats, 10);
    }

    #[test]
    fn test_vehicle_default_discards_explicit_capacity() {
        let t = trip("Sedan", Some(10), 10, 9);
        let ledger = SeatLedger::derive(t.id, 10, 1);

        let outcome = plan_reconciliation(&t, Some(&ledger), 1, CapacityPolicy::VehicleDefault);
        assert!(outcome.changed);
        assert_eq!(outcome.explicit_capacity, None);
        assert_eq!(outcome.total_seats, 4);
        assert_eq!(outcome.ledger.people_needed, 3);
    }

    #[test]
    fn test_over_occupied_clamps_to_zero() {
        let t = trip("bike", Some(6), 6, 1);

        let outcome = plan_reconciliation(&t, None, 5, CapacityPolicy::VehicleDefault);
        assert_eq!(outcome.total_seats, 1);
        assert_eq!(outcome.seats_remaining, 0);
        assert_eq!(outcome.ledger.people_already, 5);
        assert_eq!(outcome.ledger.people_needed, 0);
    }

    #[test]
    fn test_report_counts() {
        let t = trip("bike", None, 1, 1);
        let mut report = ReconcileReport::default();
        report.record(&plan_reconciliation(&t, None, 0, CapacityPolicy::PreserveExplicit));
        let ledger = SeatLedger::derive(t.id, 1, 0);
        report.record(&plan_reconciliation(&t, Some(&ledger), 0, CapacityPolicy::PreserveExplicit));

        assert_eq!(report.total_count, 2);
        assert_eq!(report.updated_count, 1);
        assert_eq!(report.updated_trip_ids, vec![t.id]);
    }
}
