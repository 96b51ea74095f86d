use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capacity::resolve_default_capacity;
use crate::seats::SeatLedger;
use crate::{CoreError, CoreResult};

const MAX_DESTINATION_LEN: usize = 255;
const MAX_VEHICLE_LEN: usize = 50;

/// A hosted trip listing.
///
/// `total_seats` and `seats_remaining` are stored copies of what the ledger
/// already says. They are rewritten on every join and by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub owner_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vehicle: String,
    pub explicit_capacity: Option<i32>,
    /// Seats taken by the host's own party at listing time.
    pub reserved_seats: i32,
    pub total_seats: i32,
    pub seats_remaining: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// The one capacity value every seat check uses.
    pub fn canonical_capacity(&self) -> i32 {
        self.explicit_capacity
            .unwrap_or_else(|| resolve_default_capacity(&self.vehicle))
    }

    pub fn occupancy(&self, joined_count: i32) -> i32 {
        self.reserved_seats + joined_count
    }

    /// Seats left, computed from the join count rather than the stored copy.
    pub fn live_seats_remaining(&self, joined_count: i32) -> i32 {
        (self.total_seats - self.occupancy(joined_count)).max(0)
    }

    /// Ledger view of the trip when no ledger row is stored.
    pub fn derived_ledger(&self, joined_count: i32) -> SeatLedger {
        SeatLedger::derive(self.id, self.canonical_capacity(), self.occupancy(joined_count))
    }
}

/// Step-one trip form as submitted by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct TripDraft {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vehicle: String,
    #[serde(default)]
    pub max_capacity: Option<i32>,
    #[serde(default)]
    pub people_already: Option<i32>,
    #[serde(default)]
    pub people_needed: Option<i32>,
}

impl TripDraft {
    /// Validates the form and builds the trip row plus its opening ledger.
    pub fn into_trip(
        self,
        owner_id: &str,
        max_seats_per_trip: i32,
        now: DateTime<Utc>,
    ) -> CoreResult<(Trip, SeatLedger)> {
        let destination = self.destination.trim().to_string();
        if destination.is_empty() {
            return Err(CoreError::validation("destination", "must not be empty"));
        }
        if destination.chars().count() > MAX_DESTINATION_LEN {
            return Err(CoreError::validation(
                "destination",
                format!("must be at most {} characters", MAX_DESTINATION_LEN),
            ));
        }

        let vehicle = self.vehicle.trim().to_string();
        if vehicle.is_empty() {
            return Err(CoreError::validation("vehicle", "must not be empty"));
        }
        if vehicle.chars().count() > MAX_VEHICLE_LEN {
            return Err(CoreError::validation(
                "vehicle",
                format!("must be at most {} characters", MAX_VEHICLE_LEN),
            ));
        }

        if self.end_date < self.start_date {
            return Err(CoreError::validation("end_date", "must not be before start_date"));
        }

        if let Some(max) = self.max_capacity {
            if max < 1 || max > max_seats_per_trip {
                return Err(CoreError::validation(
                    "max_capacity",
                    format!("must be between 1 and {}", max_seats_per_trip),
                ));
            }
        }
        let capacity = self
            .max_capacity
            .unwrap_or_else(|| resolve_default_capacity(&vehicle));

        let reserved = self.people_already.unwrap_or(0);
        if reserved < 0 || reserved > capacity {
            return Err(CoreError::validation(
                "people_already",
                format!("must be between 0 and {}", capacity),
            ));
        }

        if let Some(needed) = self.people_needed {
            if needed != capacity - reserved {
                return Err(CoreError::validation(
                    "people_needed",
                    format!(
                        "must equal max_capacity - people_already ({})",
                        capacity - reserved
                    ),
                ));
            }
        }

        let trip_id = Uuid::new_v4();
        let ledger = SeatLedger::derive(trip_id, capacity, reserved);
        let trip = Trip {
            id: trip_id,
            owner_id: owner_id.to_string(),
            destination,
            start_date: self.start_date,
            end_date: self.end_date,
            vehicle,
            explicit_capacity: self.max_capacity,
            reserved_seats: reserved,
            total_seats: capacity,
            seats_remaining: ledger.people_needed,
            created_at: now,
            updated_at: now,
        };

        Ok((trip, ledger))
    }
}

/// Row of the trip listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub id: Uuid,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vehicle: String,
    pub max_capacity: i32,
    pub people_already: i32,
    pub people_needed: i32,
}

impl TripSummary {
    pub fn new(trip: &Trip, ledger: &SeatLedger) -> Self {
        Self {
            id: trip.id,
            destination: trip.destination.clone(),
            start_date: trip.start_date,
            end_date: trip.end_date,
            vehicle: trip.vehicle.clone(),
            max_capacity: ledger.max_capacity,
            people_already: ledger.people_already,
            people_needed: ledger.people_needed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDetail {
    pub id: Uuid,
    pub owner_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub vehicle: String,
    pub explicit_capacity: Option<i32>,
    pub reserved_seats: i32,
    pub total_seats: i32,
    pub joined_count: i32,
    pub seats_remaining: i32,
    pub viewer_joined: bool,
    pub ledger: Option<SeatLedger>,
    pub created_at: DateTime<Utc>,
}

impl TripDetail {
    pub fn new(
        trip: Trip,
        ledger: Option<SeatLedger>,
        joined_count: i32,
        viewer_joined: bool,
    ) -> Self {
        Self {
            seats_remaining: trip.live_seats_remaining(joined_count),
            id: trip.id,
            owner_id: trip.owner_id,
            destination: trip.destination,
            start_date: trip.start_date,
            end_date: trip.end_date,
            vehicle: trip.vehicle,
            explicit_capacity: trip.explicit_capacity,
            reserved_seats: trip.reserved_seats,
            total_seats: trip.total_seats,
            joined_count,
            viewer_joined,
            ledger,
            created_at: trip.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(vehicle: &str) -> TripDraft {
        TripDraft {
            destination: "Goa".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
            vehicle: vehicle.to_string(),
            max_capacity: None,
            people_already: None,
            people_needed: None,
        }
    }

    fn field_of(err: CoreError) -> String {
        match err {
            CoreError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_capacity_resolved_from_vehicle() {
        let (trip, ledger) = draft("Mini Van").into_trip("host", 60, Utc::now()).unwrap();
        assert_eq!(trip.explicit_capacity, None);
        assert_eq!(trip.total_seats, 4);
        assert_eq!(trip.seats_remaining, 4);
        assert_eq!(ledger.max_capacity, 4);
        assert_eq!(ledger.people_needed, 4);
        assert_eq!(ledger.trip_id, trip.id);
    }

    #[test]
    fn test_explicit_capacity_and_reserved_seats() {
        let mut d = draft("Sedan");
        d.max_capacity = Some(10);
        d.people_already = Some(2);
        d.people_needed = Some(8);

        let (trip, ledger) = d.into_trip("host", 60, Utc::now()).unwrap();
        assert_eq!(trip.canonical_capacity(), 10);
        assert_eq!(trip.reserved_seats, 2);
        assert_eq!(ledger.people_already, 2);
        assert_eq!(ledger.people_needed, 8);
    }

    #[test]
    fn test_inconsistent_counts_rejected() {
        let mut d = draft("Sedan");
        d.max_capacity = Some(5);
        d.people_already = Some(1);
        d.people_needed = Some(3);
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "people_needed");

        let mut d = draft("bike");
        d.people_already = Some(2);
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "people_already");
    }

    #[test]
    fn test_field_validation() {
        let mut d = draft("Sedan");
        d.destination = "   ".to_string();
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "destination");

        let d = draft("");
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "vehicle");

        let mut d = draft("Sedan");
        d.end_date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "end_date");

        let mut d = draft("Sedan");
        d.max_capacity = Some(0);
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "max_capacity");

        let mut d = draft("Sedan");
        d.max_capacity = Some(61);
        assert_eq!(field_of(d.into_trip("host", 60, Utc::now()).unwrap_err()), "max_capacity");
    }

    #[test]
    fn test_live_seats_remaining_clamped() {
        let (trip, _) = draft("bike").into_trip("host", 60, Utc::now()).unwrap();
        assert_eq!(trip.live_seats_remaining(0), 1);
        assert_eq!(trip.live_seats_remaining(1), 0);
        assert_eq!(trip.live_seats_remaining(3), 0);
    }
}
