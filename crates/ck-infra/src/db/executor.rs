use std::sync::Arc;

use diesel::SqliteConnection;

use super::pool::DbPool;

/// Runs a closure against a pooled connection. Keeps the store generic
/// over where connections come from, which is what lets tests run on an
/// in-memory pool.
pub trait DbExecutor: Send + Sync {
    fn run<T>(
        &self,
        f: impl FnOnce(&mut SqliteConnection) -> anyhow::Result<T>,
    ) -> anyhow::Result<T>;
}

pub struct DieselSqliteExecutor {
    pool: Arc<DbPool>,
}

impl DieselSqliteExecutor {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

impl DbExecutor for DieselSqliteExecutor {
    fn run<T>(
        &self,
        f: impl FnOnce(&mut SqliteConnection) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut conn = self.pool.get()?;
        f(&mut conn)
    }
}
