//! Background maintenance for session token records.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::storage::repositories::{SessionTokenRepository, SqlxSessionTokenRepository};

/// Sweeps session token rows whose store-level expiry has passed.
#[derive(Clone)]
pub struct CleanupService {
    token_repository: Arc<dyn SessionTokenRepository>,
}

impl CleanupService {
    pub fn new(token_repository: Arc<dyn SessionTokenRepository>) -> Self {
        Self { token_repository }
    }

    pub fn with_sqlx(pool: crate::storage::DbPool) -> Self {
        Self::new(Arc::new(SqlxSessionTokenRepository::new(pool)))
    }

    /// Delete expired session token records once.
    pub async fn run_once(&self) -> Result<u64> {
        let removed = self.token_repository.delete_expired(Utc::now()).await?;

        if removed > 0 {
            info!(removed = removed, "swept expired session tokens");
        } else {
            debug!("no expired session tokens to sweep");
        }

        Ok(removed)
    }
}
