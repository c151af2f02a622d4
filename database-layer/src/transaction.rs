// Transaction management
use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{Transaction, Postgres};
use tracing::debug;

/// Opens transactions with session-local guards applied
#[derive(Clone)]
pub struct TransactionManager {
    pool: DatabasePool,
    lock_timeout_ms: Option<u64>,
}

impl TransactionManager {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            lock_timeout_ms: None,
        }
    }

    /// Abort a transaction that waits longer than this for a row lock
    pub fn with_lock_timeout(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = Some(lock_timeout_ms);
        self
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Begin a new transaction.
    ///
    /// Dropping the returned transaction without committing rolls it back.
    pub async fn begin(&self) -> DatabaseResult<Transaction<'static, Postgres>> {
        debug!("Beginning transaction");

        let mut tx = self.pool.pool()
            .begin()
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Failed to begin transaction: {}", e)))?;

        if let Some(timeout) = self.lock_timeout_ms {
            // SET does not accept bind parameters; the value is an integer
            let sql = format!("SET LOCAL lock_timeout = '{}ms'", timeout);
            sqlx::query(&sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::QueryFailed(format!("Failed to apply lock timeout: {}", e)))?;
        }

        Ok(tx)
    }
}
