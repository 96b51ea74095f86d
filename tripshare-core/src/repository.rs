use async_trait::async_trait;
use uuid::Uuid;

use crate::capacity::CapacityPolicy;
use crate::join::JoinReceipt;
use crate::reconcile::TripReconciliation;
use crate::seats::SeatLedger;
use crate::trip::Trip;
use crate::CoreResult;

/// Persistence for trips, seat ledgers and the join registry.
///
/// `join_trip` and `reconcile_trip` are each one atomic unit per trip:
/// implementations lock the trip, read the snapshot, apply
/// [`crate::join::plan_join`] or [`crate::reconcile::plan_reconciliation`]
/// and write the result before releasing it.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Inserts a trip with its opening ledger. Imported legacy trips may
    /// come without one.
    async fn create_trip(&self, trip: &Trip, ledger: Option<&SeatLedger>) -> CoreResult<()>;

    async fn get_trip(&self, id: Uuid) -> CoreResult<Option<Trip>>;

    /// Newest first.
    async fn list_trips(&self) -> CoreResult<Vec<Trip>>;

    async fn list_trip_ids(&self) -> CoreResult<Vec<Uuid>>;

    async fn get_ledger(&self, trip_id: Uuid) -> CoreResult<Option<SeatLedger>>;

    /// Replaces the stored triple unconditionally, creating the row if needed.
    async fn overwrite_ledger(&self, ledger: &SeatLedger) -> CoreResult<()>;

    async fn has_joined(&self, trip_id: Uuid, user_id: &str) -> CoreResult<bool>;

    async fn count_joined(&self, trip_id: Uuid) -> CoreResult<i32>;

    async fn join_trip(&self, trip_id: Uuid, user_id: &str) -> CoreResult<JoinReceipt>;

    /// Returns `None` when the trip no longer exists.
    async fn reconcile_trip(
        &self,
        trip_id: Uuid,
        policy: CapacityPolicy,
    ) -> CoreResult<Option<TripReconciliation>>;
}
