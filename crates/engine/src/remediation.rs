//! Remediation backends, i.e. what happens to an address once it bounced.

use std::future::Future;

use sqlx::MySqlPool;

use bounce_common::config::SenderBackend;
use bounce_common::db::create_pool;
use bounce_common::error::AppError;

/// Action taken for each bounced or complained address.
///
/// Called at most once per dequeued address; a failure is logged by the
/// worker and the address is dropped.
pub trait Remediator: Send + Sync + 'static {
    fn remediate(&self, address: &str) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Runs a configured statement with the address bound to its single `?`.
#[derive(Debug, Clone)]
pub struct SqlRemediator {
    pool: MySqlPool,
    statement: String,
}

impl SqlRemediator {
    pub fn new(pool: MySqlPool, statement: impl Into<String>) -> Self {
        Self {
            pool,
            statement: statement.into(),
        }
    }

    /// Open a pool for `backend` and verify the database answers.
    pub async fn connect(backend: &SenderBackend, max_connections: u32) -> anyhow::Result<Self> {
        let pool = create_pool(&backend.dsn, max_connections).await?;
        Ok(Self::new(pool, backend.sql.clone()))
    }
}

impl Remediator for SqlRemediator {
    async fn remediate(&self, address: &str) -> Result<(), AppError> {
        let result = sqlx::query(&self.statement)
            .bind(address)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            address,
            rows_affected = result.rows_affected(),
            "Remediation statement executed"
        );
        Ok(())
    }
}
