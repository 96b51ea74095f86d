pub mod capacity;
pub mod seats;
pub mod trip;
pub mod join;
pub mod reconcile;
pub mod repository;
pub mod service;

use uuid::Uuid;

pub use capacity::{resolve_default_capacity, CapacityPolicy};
pub use join::JoinReceipt;
pub use reconcile::ReconcileReport;
pub use repository::TripStore;
pub use seats::SeatLedger;
pub use service::{SeatRules, SeatService};
pub use trip::{Trip, TripDetail, TripDraft, TripSummary};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed on `{field}`: {message}")]
    ValidationError { field: String, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("User {user_id} has already joined trip {trip_id}")]
    DuplicateJoin { trip_id: Uuid, user_id: String },
    #[error("Trip {trip_id} is full: {occupied} of {capacity} seats taken")]
    CapacityExceeded {
        trip_id: Uuid,
        capacity: i32,
        occupied: i32,
    },
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        CoreError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn trip_not_found(trip_id: Uuid) -> Self {
        CoreError::NotFound(format!("Trip {} not found", trip_id))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
