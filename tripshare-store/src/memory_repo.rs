use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use tripshare_core::join::{plan_join, JoinSnapshot};
use tripshare_core::reconcile::{plan_reconciliation, TripReconciliation};
use tripshare_core::{
    CapacityPolicy, CoreError, CoreResult, JoinReceipt, SeatLedger, Trip, TripStore,
};

#[derive(Default)]
struct Tables {
    trips: HashMap<Uuid, Trip>,
    ledgers: HashMap<Uuid, SeatLedger>,
    /// Append-only join registry, in join order per trip.
    joins: HashMap<Uuid, Vec<(String, DateTime<Utc>)>>,
}

impl Tables {
    fn joined_count(&self, trip_id: &Uuid) -> i32 {
        self.joins.get(trip_id).map_or(0, |j| j.len() as i32)
    }

    fn has_joined(&self, trip_id: &Uuid, user_id: &str) -> bool {
        self.joins
            .get(trip_id)
            .is_some_and(|j| j.iter().any(|(user, _)| user == user_id))
    }
}

/// Process-local [`TripStore`]. One lock covers every table, so each
/// operation is a single critical section.
#[derive(Default)]
pub struct InMemoryTripStore {
    tables: Mutex<Tables>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripStore for InMemoryTripStore {
    async fn create_trip(&self, trip: &Trip, ledger: Option<&SeatLedger>) -> CoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.trips.contains_key(&trip.id) {
            return Err(CoreError::InternalError(format!("trip {} already exists", trip.id)));
        }

        tables.trips.insert(trip.id, trip.clone());
        if let Some(ledger) = ledger {
            tables.ledgers.insert(trip.id, *ledger);
        }
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> CoreResult<Option<Trip>> {
        Ok(self.tables.lock().await.trips.get(&id).cloned())
    }

    async fn list_trips(&self) -> CoreResult<Vec<Trip>> {
        let tables = self.tables.lock().await;
        let mut trips: Vec<Trip> = tables.trips.values().cloned().collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trips)
    }

    async fn list_trip_ids(&self) -> CoreResult<Vec<Uuid>> {
        let tables = self.tables.lock().await;
        let mut trips: Vec<&Trip> = tables.trips.values().collect();
        trips.sort_by_key(|t| t.created_at);
        Ok(trips.into_iter().map(|t| t.id).collect())
    }

    async fn get_ledger(&self, trip_id: Uuid) -> CoreResult<Option<SeatLedger>> {
        Ok(self.tables.lock().await.ledgers.get(&trip_id).copied())
    }

    async fn overwrite_ledger(&self, ledger: &SeatLedger) -> CoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.trips.contains_key(&ledger.trip_id) {
            return Err(CoreError::trip_not_found(ledger.trip_id));
        }
        tables.ledgers.insert(ledger.trip_id, *ledger);
        Ok(())
    }

    async fn has_joined(&self, trip_id: Uuid, user_id: &str) -> CoreResult<bool> {
        Ok(self.tables.lock().await.has_joined(&trip_id, user_id))
    }

    async fn count_joined(&self, trip_id: Uuid) -> CoreResult<i32> {
        Ok(self.tables.lock().await.joined_count(&trip_id))
    }

    async fn join_trip(&self, trip_id: Uuid, user_id: &str) -> CoreResult<JoinReceipt> {
        let mut tables = self.tables.lock().await;

        let trip = tables
            .trips
            .get(&trip_id)
            .ok_or_else(|| CoreError::trip_not_found(trip_id))?;

        let plan = plan_join(
            JoinSnapshot {
                trip,
                ledger: tables.ledgers.get(&trip_id),
                joined_count: tables.joined_count(&trip_id),
                already_joined: tables.has_joined(&trip_id, user_id),
            },
            user_id,
        )?;
        if plan.rebased {
            warn!("Seat ledger for trip {} had drifted from the join registry, rebased", trip_id);
        }

        let joined_at = Utc::now();
        tables
            .joins
            .entry(trip_id)
            .or_default()
            .push((user_id.to_string(), joined_at));
        tables.ledgers.insert(trip_id, plan.ledger);
        if let Some(trip) = tables.trips.get_mut(&trip_id) {
            trip.total_seats = plan.total_seats;
            trip.seats_remaining = plan.seats_remaining;
            trip.updated_at = joined_at;
        }

        Ok(JoinReceipt {
            trip_id,
            user_id: user_id.to_string(),
            ledger: plan.ledger,
            joined_at,
        })
    }

    async fn reconcile_trip(
        &self,
        trip_id: Uuid,
        policy: CapacityPolicy,
    ) -> CoreResult<Option<TripReconciliation>> {
        let mut tables = self.tables.lock().await;

        let Some(trip) = tables.trips.get(&trip_id) else {
            return Ok(None);
        };
        let outcome = plan_reconciliation(
            trip,
            tables.ledgers.get(&trip_id),
            tables.joined_count(&trip_id),
            policy,
        );
        if !outcome.changed {
            return Ok(Some(outcome));
        }

        tables.ledgers.insert(trip_id, outcome.ledger);
        if let Some(trip) = tables.trips.get_mut(&trip_id) {
            trip.explicit_capacity = outcome.explicit_capacity;
            trip.total_seats = outcome.total_seats;
            trip.seats_remaining = outcome.seats_remaining;
            trip.updated_at = Utc::now();
        }
        Ok(Some(outcome))
    }
}
