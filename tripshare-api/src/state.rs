use std::sync::Arc;
use tokio::sync::broadcast;
use tripshare_core::SeatService;
use tripshare_shared::SeatUpdateEvent;
use tripshare_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub seats: SeatService,
    /// Rate limiting is skipped when no Redis is configured.
    pub redis: Option<Arc<RedisClient>>,
    pub seat_tx: broadcast::Sender<SeatUpdateEvent>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
}
