/// Database layer for TaskFlow
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded sqlx migrations from the workspace `migrations/`
///
/// Queries live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
