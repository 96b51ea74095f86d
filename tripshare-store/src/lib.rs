pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod redis_repo;
pub mod trip_repo;

pub use database::DbClient;
pub use memory_repo::InMemoryTripStore;
pub use redis_repo::RedisClient;
pub use trip_repo::PgTripStore;
