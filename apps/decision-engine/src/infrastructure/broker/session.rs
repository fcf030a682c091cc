//! Broker session tokens.
//!
//! Tokens are shared by every concurrent broker call. A token close to
//! expiry is refreshed exactly once: callers that find it stale queue on the
//! write lock and re-check before issuing a new one.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::application::ports::{BrokerError, RequestContext};
use crate::observability::record_token_refresh;

/// An access token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Bearer token.
    pub access_token: String,
    /// Expiry reported by the issuer.
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Whether the token is still usable `margin` before expiry.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

/// Source of new tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Obtain a fresh token.
    async fn issue(&self) -> Result<SessionToken, BrokerError>;
}

/// Holds the current token and refreshes it on demand.
#[derive(Debug)]
pub struct SessionManager<I: TokenIssuer> {
    issuer: I,
    refresh_margin: Duration,
    token: RwLock<Option<SessionToken>>,
}

impl<I: TokenIssuer> SessionManager<I> {
    /// Create a manager; no token is fetched until first use.
    #[must_use]
    pub fn new(issuer: I, refresh_margin: Duration) -> Self {
        Self {
            issuer,
            refresh_margin,
            token: RwLock::new(None),
        }
    }

    /// The issuer.
    pub const fn issuer(&self) -> &I {
        &self.issuer
    }

    /// A token valid for at least the refresh margin.
    ///
    /// # Errors
    ///
    /// Returns the issuer's error, or `Timeout`/`Cancelled` from `ctx`.
    pub async fn get_valid_token(&self, ctx: &RequestContext) -> Result<String, BrokerError> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(Utc::now(), self.refresh_margin)) {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh(Utc::now(), self.refresh_margin)) {
            return Ok(token.access_token.clone());
        }

        let token = ctx.run(self.issuer.issue()).await?;
        info!(expires_at = %token.expires_at, "Broker session token refreshed");
        record_token_refresh();
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    /// Drop the current token if it is still the one the broker rejected,
    /// so the next call refreshes it. Returns whether a token was dropped.
    pub async fn invalidate(&self, rejected: &str) -> bool {
        let mut guard = self.token.write().await;
        if guard.as_ref().is_some_and(|t| t.access_token == rejected) {
            *guard = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingIssuer {
        issued: AtomicUsize,
        lifetime: chrono::Duration,
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue(&self) -> Result<SessionToken, BrokerError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(SessionToken {
                access_token: format!("token-{n}"),
                expires_at: Utc::now() + self.lifetime,
            })
        }
    }

    fn manager(lifetime: chrono::Duration) -> Arc<SessionManager<CountingIssuer>> {
        Arc::new(SessionManager::new(
            CountingIssuer {
                issued: AtomicUsize::new(0),
                lifetime,
            },
            Duration::from_secs(60),
        ))
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let sessions = manager(chrono::Duration::hours(1));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let sessions = Arc::clone(&sessions);
                tokio::spawn(async move { sessions.get_valid_token(&ctx()).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(sessions.issuer().issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_inside_margin_is_refreshed() {
        let sessions = manager(chrono::Duration::seconds(30));

        assert_eq!(sessions.get_valid_token(&ctx()).await.unwrap(), "token-1");
        assert_eq!(sessions.get_valid_token(&ctx()).await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let sessions = manager(chrono::Duration::hours(1));

        let first = sessions.get_valid_token(&ctx()).await.unwrap();
        assert!(sessions.invalidate(&first).await);
        assert_eq!(sessions.get_valid_token(&ctx()).await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn concurrent_rejections_of_one_token_refresh_once() {
        let sessions = manager(chrono::Duration::hours(1));
        let rejected = sessions.get_valid_token(&ctx()).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let sessions = Arc::clone(&sessions);
                let rejected = rejected.clone();
                tokio::spawn(async move {
                    sessions.invalidate(&rejected).await;
                    sessions.get_valid_token(&ctx()).await
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-2");
        }
        assert_eq!(sessions.issuer().issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_rejection_keeps_newer_token() {
        let sessions = manager(chrono::Duration::hours(1));
        let old = sessions.get_valid_token(&ctx()).await.unwrap();
        assert!(sessions.invalidate(&old).await);
        let current = sessions.get_valid_token(&ctx()).await.unwrap();

        assert!(!sessions.invalidate(&old).await);
        assert_eq!(sessions.get_valid_token(&ctx()).await.unwrap(), current);
    }

    #[test]
    fn freshness_respects_margin() {
        let now = Utc::now();
        let token = SessionToken {
            access_token: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(90),
        };
        assert!(token.is_fresh(now, Duration::from_secs(60)));
        assert!(!token.is_fresh(now, Duration::from_secs(120)));
    }
}
