use std::convert::Infallible;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use uuid::Uuid;

use tripshare_core::{TripDetail, TripDraft, TripSummary};

use crate::{error::AppError, middleware::Claims, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreateTripResponse {
    pub trip_id: Uuid,
    pub max_capacity: i32,
    pub people_needed: i32,
}

#[derive(Debug, Serialize)]
pub struct JoinTripResponse {
    pub trip_id: Uuid,
    pub people_already: i32,
    pub people_needed: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", post(create_trip).get(list_trips))
        .route("/v1/trips/{id}", get(get_trip))
        .route("/v1/trips/{id}/join", post(join_trip))
        .route("/v1/trips/{id}/stream", get(stream_seats))
}

// ============================================================================
// Handlers
// ============================================================================

fn trip_id_from(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(trip_id)| trip_id)
        .map_err(|rejection| AppError::ValidationError {
            field: "trip_id".to_string(),
            message: rejection.body_text(),
        })
}

/// POST /v1/trips
async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<TripDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateTripResponse>), AppError> {
    let Json(draft) = payload.map_err(|rejection| AppError::ValidationError {
        field: "body".to_string(),
        message: rejection.body_text(),
    })?;

    let created = state.seats.create_trip(&claims.sub, draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTripResponse {
            trip_id: created.trip_id,
            max_capacity: created.ledger.max_capacity,
            people_needed: created.ledger.people_needed,
        }),
    ))
}

/// GET /v1/trips
async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<TripSummary>>, AppError> {
    Ok(Json(state.seats.list_trips().await?))
}

/// GET /v1/trips/{id}
async fn get_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TripDetail>, AppError> {
    let trip_id = trip_id_from(path)?;
    Ok(Json(state.seats.trip_detail(trip_id, &claims.sub).await?))
}

/// POST /v1/trips/{id}/join
async fn join_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JoinTripResponse>, AppError> {
    let trip_id = trip_id_from(path)?;
    let receipt = state.seats.join_trip(trip_id, &claims.sub).await?;

    // No subscribers is fine
    let _ = state.seat_tx.send(receipt.to_event());

    Ok(Json(JoinTripResponse {
        trip_id,
        people_already: receipt.ledger.people_already,
        people_needed: receipt.ledger.people_needed,
    }))
}

/// GET /v1/trips/{id}/stream
/// Server-sent `seat_update` events for one trip.
async fn stream_seats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let trip_id = trip_id_from(path)?;

    // 404 before subscribing
    state.seats.trip_detail(trip_id, &claims.sub).await?;

    let rx = state.seat_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.trip_id == trip_id => event
            .to_json()
            .ok()
            .map(|data| Ok(Event::default().event("seat_update").data(data))),
        // Lagged receivers skip missed updates
        _ => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
