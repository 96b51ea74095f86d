use axum::{extract::State, routing::post, Json, Router};
use tripshare_core::ReconcileReport;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/admin/reconcile", post(reconcile_all))
}

/// POST /v1/admin/reconcile
/// Recomputes every trip's seat counters from the join registry.
async fn reconcile_all(State(state): State<AppState>) -> Result<Json<ReconcileReport>, AppError> {
    Ok(Json(state.seats.reconcile_all().await?))
}
