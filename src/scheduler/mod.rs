//! Listing expiry sweep.
//!
//! Expiry is also evaluated lazily at read and bid time; the sweep keeps the
//! persisted status converging so list views and downstream consumers see
//! ENDED without having to derive it. COMPLETED rows are never touched.
// region:    --- Imports
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Listing Sweeper

pub struct ListingSweeper {
    pool: Arc<PgPool>,
}

impl ListingSweeper {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Run the sweep every second in the background
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep_expired_listings(&pool).await {
                    error!("{:<12} --> listing sweep failed: {:?}", "Scheduler", e);
                }
            }
        });
    }

    async fn sweep_expired_listings(pool: &PgPool) -> Result<(), sqlx::Error> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE listings SET status = 'ENDED'
             WHERE status = 'ACTIVE' AND expires_at <= $1",
        )
        .bind(now)
        .execute(pool)
        .await?;

        debug!("{:<12} --> expired listings swept", "Scheduler");

        Ok(())
    }
}

// endregion: --- Listing Sweeper
