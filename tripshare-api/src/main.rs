use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tripshare_api::{
    app,
    state::{AppState, AuthConfig},
};
use tripshare_core::{SeatService, TripStore};
use tripshare_store::{
    app_config::Config, DbClient, InMemoryTripStore, PgTripStore, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "tripshare_api=debug,tripshare_core=debug,tower_http=debug,axum::rejection=trace".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Tripshare API on port {}", config.server.port);

    let store: Arc<dyn TripStore> = if config.database.url.is_empty() {
        tracing::warn!("No database url configured, trips are kept in memory");
        Arc::new(InMemoryTripStore::new())
    } else {
        let db = DbClient::new(&config.database)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;
        Arc::new(PgTripStore::new(db.pool.clone()))
    };

    let redis = match config.redis.url.as_deref() {
        Some(url) => Some(Arc::new(RedisClient::new(url).context("Invalid Redis url")?)),
        None => None,
    };

    // Seat update fan-out for SSE subscribers
    let (seat_tx, _) = tokio::sync::broadcast::channel(100);

    let app_state = AppState {
        seats: SeatService::new(store, config.business_rules.seat_rules()),
        redis,
        seat_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        rate_limit_per_minute: config.business_rules.rate_limit_per_minute,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
