use sqlx::PgPool;

/// Executes the `Processor` commands defined in [`crate::entities`]
/// against a shared connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
