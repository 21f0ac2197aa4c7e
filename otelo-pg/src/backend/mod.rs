//! Backend PostgreSQL (pool de connexions, requêtes, relecture)

pub mod pool;
pub mod postgres;
pub mod sql;

pub use pool::{create_pool, test_connection, DatabaseConfig, PoolTimeouts, SslMode};
pub use postgres::{PgBackend, RetryPolicy};
