//! Periodic removal of expired token records.
//!
//! Stores keep expired tokens until swept. The sweeper deletes every token
//! whose `expires_at` has been reached, with no grace period.

use crate::storage::traits::AdminStorage;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Background task purging expired tokens on a fixed interval
pub struct TokenSweeper {
    storage: Arc<dyn AdminStorage>,
    interval: Duration,
}

impl TokenSweeper {
    pub fn new(storage: Arc<dyn AdminStorage>, interval: Duration) -> Self {
        Self { storage, interval }
    }

    /// Run one sweep at `now`, returning the number of purged tokens
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        match self.storage.purge_expired_tokens(now).await {
            Ok(0) => 0,
            Ok(purged) => {
                tracing::debug!(purged, "purged expired tokens");
                purged
            }
            Err(err) => {
                tracing::warn!(error = ?err, "token sweep failed");
                0
            }
        }
    }

    /// Sweep until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("token sweeper received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    self.sweep_at(Utc::now()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::types::{Token, TokenKind};
    use crate::storage::MemoryAdminStorage;
    use crate::storage::traits::TokenStore;

    fn token(signature: &str, expires_at: DateTime<Utc>) -> Token {
        Token {
            signature: signature.to_string(),
            kind: TokenKind::DeviceCode,
            client_id: "client".to_string(),
            user_id: None,
            scopes: vec![],
            created_at: expires_at - chrono::Duration::minutes(10),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let storage = Arc::new(MemoryAdminStorage::new());
        let now = Utc::now();
        storage
            .insert_token(&token("stale", now - chrono::Duration::seconds(30)))
            .await
            .unwrap();
        storage
            .insert_token(&token("fresh", now + chrono::Duration::seconds(30)))
            .await
            .unwrap();

        let sweeper = TokenSweeper::new(storage.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_at(now).await, 1);
        assert!(storage.find_token("stale").await.unwrap().is_none());
        assert!(storage.find_token("fresh").await.unwrap().is_some());

        // Advancing the clock past the second expiry removes it as well
        assert_eq!(sweeper.sweep_at(now + chrono::Duration::minutes(1)).await, 1);
        assert!(storage.list_tokens().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let storage = Arc::new(MemoryAdminStorage::new());
        let sweeper = TokenSweeper::new(storage, Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(cancel.clone()));
        cancel.cancel();
        handle.await.unwrap();
    }
}
