use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::capacity::CapacityPolicy;
use crate::join::JoinReceipt;
use crate::reconcile::ReconcileReport;
use crate::repository::TripStore;
use crate::trip::{TripDetail, TripDraft, TripSummary};
use crate::{CoreError, CoreResult, SeatLedger};

#[derive(Debug, Clone, Copy)]
pub struct SeatRules {
    pub max_seats_per_trip: i32,
    pub capacity_policy: CapacityPolicy,
}

impl Default for SeatRules {
    fn default() -> Self {
        Self {
            max_seats_per_trip: 60,
            capacity_policy: CapacityPolicy::PreserveExplicit,
        }
    }
}

/// Seat accounting over a [`TripStore`].
#[derive(Clone)]
pub struct SeatService {
    store: Arc<dyn TripStore>,
    rules: SeatRules,
}

#[derive(Debug, Clone)]
pub struct TripCreated {
    pub trip_id: Uuid,
    pub ledger: SeatLedger,
}

impl SeatService {
    pub fn new(store: Arc<dyn TripStore>, rules: SeatRules) -> Self {
        Self { store, rules }
    }

    pub async fn create_trip(&self, owner_id: &str, draft: TripDraft) -> CoreResult<TripCreated> {
        let (trip, ledger) = draft.into_trip(owner_id, self.rules.max_seats_per_trip, Utc::now())?;
        self.store.create_trip(&trip, Some(&ledger)).await?;

        info!(
            "Trip {} created by {}: {} seats ({} reserved)",
            trip.id, owner_id, ledger.max_capacity, trip.reserved_seats
        );

        Ok(TripCreated {
            trip_id: trip.id,
            ledger,
        })
    }

    pub async fn list_trips(&self) -> CoreResult<Vec<TripSummary>> {
        let trips = self.store.list_trips().await?;

        let mut summaries = Vec::with_capacity(trips.len());
        for trip in trips {
            let ledger = match self.store.get_ledger(trip.id).await? {
                Some(ledger) => ledger,
                None => trip.derived_ledger(self.store.count_joined(trip.id).await?),
            };
            summaries.push(TripSummary::new(&trip, &ledger));
        }
        Ok(summaries)
    }

    /// Trip fields plus live seat counts, as seen by `viewer_id`.
    pub async fn trip_detail(&self, trip_id: Uuid, viewer_id: &str) -> CoreResult<TripDetail> {
        let trip = self
            .store
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| CoreError::trip_not_found(trip_id))?;
        let ledger = self.store.get_ledger(trip_id).await?;
        let joined_count = self.store.count_joined(trip_id).await?;
        let viewer_joined = self.store.has_joined(trip_id, viewer_id).await?;

        Ok(TripDetail::new(trip, ledger, joined_count, viewer_joined))
    }

    pub async fn join_trip(&self, trip_id: Uuid, user_id: &str) -> CoreResult<JoinReceipt> {
        match self.store.join_trip(trip_id, user_id).await {
            Ok(receipt) => {
                info!(
                    "User {} joined trip {}: {}/{} seats taken, {} needed",
                    user_id,
                    trip_id,
                    receipt.ledger.people_already,
                    receipt.ledger.max_capacity,
                    receipt.ledger.people_needed
                );
                Ok(receipt)
            }
            Err(e) => {
                if !matches!(e, CoreError::InternalError(_)) {
                    warn!("Join of trip {} by {} rejected: {}", trip_id, user_id, e);
                }
                Err(e)
            }
        }
    }

    /// Heals every trip's counters from the join registry, one trip at a time.
    pub async fn reconcile_all(&self) -> CoreResult<ReconcileReport> {
        let policy = self.rules.capacity_policy;
        let mut report = ReconcileReport::default();

        for trip_id in self.store.list_trip_ids().await? {
            if let Some(outcome) = self.store.reconcile_trip(trip_id, policy).await? {
                if outcome.changed {
                    info!(
                        "Reconciled trip {}: capacity {}, remaining {}",
                        trip_id, outcome.total_seats, outcome.seats_remaining
                    );
                }
                report.record(&outcome);
            }
        }

        info!(
            "Reconciliation finished ({:?}): {} of {} trips updated",
            policy, report.updated_count, report.total_count
        );
        Ok(report)
    }
}
