use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::warn;
use uuid::Uuid;

use tripshare_core::join::{plan_join, JoinSnapshot};
use tripshare_core::reconcile::{plan_reconciliation, TripReconciliation};
use tripshare_core::{
    CapacityPolicy, CoreError, CoreResult, JoinReceipt, SeatLedger, Trip, TripStore,
};

pub struct PgTripStore {
    pool: PgPool,
}

impl PgTripStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    owner_id: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    vehicle: String,
    explicit_capacity: Option<i32>,
    reserved_seats: i32,
    total_seats: i32,
    seats_remaining: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            owner_id: row.owner_id,
            destination: row.destination,
            start_date: row.start_date,
            end_date: row.end_date,
            vehicle: row.vehicle,
            explicit_capacity: row.explicit_capacity,
            reserved_seats: row.reserved_seats,
            total_seats: row.total_seats,
            seats_remaining: row.seats_remaining,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    trip_id: Uuid,
    max_capacity: i32,
    people_already: i32,
    people_needed: i32,
}

impl From<LedgerRow> for SeatLedger {
    fn from(row: LedgerRow) -> Self {
        SeatLedger {
            trip_id: row.trip_id,
            max_capacity: row.max_capacity,
            people_already: row.people_already,
            people_needed: row.people_needed,
        }
    }
}

const TRIP_COLUMNS: &str = "id, owner_id, destination, start_date, end_date, vehicle, \
     explicit_capacity, reserved_seats, total_seats, seats_remaining, created_at, updated_at";

fn storage(e: sqlx::Error) -> CoreError {
    CoreError::InternalError(format!("database: {}", e))
}

async fn fetch_trip<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    for_update: bool,
) -> Result<Option<Trip>, sqlx::Error> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {} FROM trips WHERE id = $1{}", TRIP_COLUMNS, lock);

    let row = sqlx::query_as::<_, TripRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(Trip::from))
}

async fn fetch_ledger<'e, E: PgExecutor<'e>>(
    executor: E,
    trip_id: Uuid,
) -> Result<Option<SeatLedger>, sqlx::Error> {
    let row = sqlx::query_as::<_, LedgerRow>(
        "SELECT trip_id, max_capacity, people_already, people_needed \
         FROM seat_ledgers WHERE trip_id = $1",
    )
    .bind(trip_id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(SeatLedger::from))
}

async fn upsert_ledger<'e, E: PgExecutor<'e>>(
    executor: E,
    ledger: &SeatLedger,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO seat_ledgers (trip_id, max_capacity, people_already, people_needed)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (trip_id) DO UPDATE
        SET max_capacity = EXCLUDED.max_capacity,
            people_already = EXCLUDED.people_already,
            people_needed = EXCLUDED.people_needed,
            updated_at = NOW()
        "#,
    )
    .bind(ledger.trip_id)
    .bind(ledger.max_capacity)
    .bind(ledger.people_already)
    .bind(ledger.people_needed)
    .execute(executor)
    .await?;
    Ok(())
}

async fn count_joins<'e, E: PgExecutor<'e>>(
    executor: E,
    trip_id: Uuid,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT COUNT(*)::INT4 FROM trip_joins WHERE trip_id = $1")
        .bind(trip_id)
        .fetch_one(executor)
        .await
}

async fn join_exists<'e, E: PgExecutor<'e>>(
    executor: E,
    trip_id: Uuid,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM trip_joins WHERE trip_id = $1 AND user_id = $2)",
    )
    .bind(trip_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl TripStore for PgTripStore {
    async fn create_trip(&self, trip: &Trip, ledger: Option<&SeatLedger>) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO trips (id, owner_id, destination, start_date, end_date, vehicle,
                               explicit_capacity, reserved_seats, total_seats, seats_remaining,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(trip.id)
        .bind(&trip.owner_id)
        .bind(&trip.destination)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(&trip.vehicle)
        .bind(trip.explicit_capacity)
        .bind(trip.reserved_seats)
        .bind(trip.total_seats)
        .bind(trip.seats_remaining)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if let Some(ledger) = ledger {
            upsert_ledger(&mut *tx, ledger).await.map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> CoreResult<Option<Trip>> {
        fetch_trip(&self.pool, id, false).await.map_err(storage)
    }

    async fn list_trips(&self) -> CoreResult<Vec<Trip>> {
        let sql = format!("SELECT {} FROM trips ORDER BY created_at DESC", TRIP_COLUMNS);
        let rows = sqlx::query_as::<_, TripRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn list_trip_ids(&self) -> CoreResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM trips ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)
    }

    async fn get_ledger(&self, trip_id: Uuid) -> CoreResult<Option<SeatLedger>> {
        fetch_ledger(&self.pool, trip_id).await.map_err(storage)
    }

    async fn overwrite_ledger(&self, ledger: &SeatLedger) -> CoreResult<()> {
        upsert_ledger(&self.pool, ledger).await.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                CoreError::trip_not_found(ledger.trip_id)
            }
            other => storage(other),
        })
    }

    async fn has_joined(&self, trip_id: Uuid, user_id: &str) -> CoreResult<bool> {
        join_exists(&self.pool, trip_id, user_id).await.map_err(storage)
    }

    async fn count_joined(&self, trip_id: Uuid) -> CoreResult<i32> {
        count_joins(&self.pool, trip_id).await.map_err(storage)
    }

    async fn join_trip(&self, trip_id: Uuid, user_id: &str) -> CoreResult<JoinReceipt> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Row lock serializes joins and reconciliation on this trip
        let trip = fetch_trip(&mut *tx, trip_id, true)
            .await
            .map_err(storage)?
            .ok_or_else(|| CoreError::trip_not_found(trip_id))?;
        let ledger = fetch_ledger(&mut *tx, trip_id).await.map_err(storage)?;
        let joined_count = count_joins(&mut *tx, trip_id).await.map_err(storage)?;
        let already_joined = join_exists(&mut *tx, trip_id, user_id).await.map_err(storage)?;

        let plan = plan_join(
            JoinSnapshot {
                trip: &trip,
                ledger: ledger.as_ref(),
                joined_count,
                already_joined,
            },
            user_id,
        )?;
        if plan.rebased {
            warn!("Seat ledger for trip {} had drifted from the join registry, rebased", trip_id);
        }

        let joined_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            "INSERT INTO trip_joins (trip_id, user_id) VALUES ($1, $2) RETURNING joined_at",
        )
        .bind(trip_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => CoreError::DuplicateJoin {
                trip_id,
                user_id: user_id.to_string(),
            },
            other => storage(other),
        })?;

        upsert_ledger(&mut *tx, &plan.ledger).await.map_err(storage)?;

        sqlx::query(
            r#"
            UPDATE trips
            SET total_seats = $1, seats_remaining = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(plan.total_seats)
        .bind(plan.seats_remaining)
        .bind(trip_id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

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
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let Some(trip) = fetch_trip(&mut *tx, trip_id, true).await.map_err(storage)? else {
            return Ok(None);
        };
        let ledger = fetch_ledger(&mut *tx, trip_id).await.map_err(storage)?;
        let joined_count = count_joins(&mut *tx, trip_id).await.map_err(storage)?;

        let outcome = plan_reconciliation(&trip, ledger.as_ref(), joined_count, policy);
        if !outcome.changed {
            return Ok(Some(outcome));
        }

        sqlx::query(
            r#"
            UPDATE trips
            SET explicit_capacity = $1, total_seats = $2, seats_remaining = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(outcome.explicit_capacity)
        .bind(outcome.total_seats)
        .bind(outcome.seats_remaining)
        .bind(trip_id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        upsert_ledger(&mut *tx, &outcome.ledger).await.map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(Some(outcome))
    }
}
