//! Windowed login-attempt counters.
//!
//! Flow Overview:
//! 1) Each login attempt maps to an [`AttemptKey`] (client IP + email digest).
//! 2) One atomic upsert per attempt increments the active window or starts a
//!    fresh one once the previous window has expired.
//! 3) A successful login deletes the key so the owner is not throttled after
//!    proving identity.
//!
//! Scaling: the Postgres store synchronizes counters across service
//! instances; the conditional upsert is a single statement, so concurrent
//! attempts for the same key serialize on the row and never lose an update.

use async_trait::async_trait;
use base64ct::{Base64Unpadded, Encoding};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, Instrument};

use super::handlers::normalize_email;

/// One rate-limit bucket: requesting client plus targeted account.
///
/// The email is digested before it becomes part of the key, so the counter
/// store never holds a plaintext address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    client_ip: String,
    email_digest: String,
}

impl AttemptKey {
    #[must_use]
    pub fn new(client_ip: &str, email: &str) -> Self {
        let digest = Sha256::digest(normalize_email(email).as_bytes());
        Self {
            client_ip: client_ip.to_string(),
            email_digest: Base64Unpadded::encode_string(digest.as_slice()),
        }
    }

    #[must_use]
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    #[must_use]
    pub fn email_digest(&self) -> &str {
        &self.email_digest
    }
}

/// Counter state right after an increment.
#[derive(Clone, Copy, Debug)]
pub struct WindowSnapshot {
    pub count: i64,
    pub window_started_at: DateTime<Utc>,
}

impl WindowSnapshot {
    /// Seconds left in the active window, never below 1 while the snapshot is
    /// being used to reject a request.
    #[must_use]
    pub fn retry_after_seconds(&self, window: Duration) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.window_started_at)
            .num_seconds()
            .max(0);
        let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        u64::try_from((window_secs - elapsed).max(1)).unwrap_or(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent attempt counters shared by every handler instance.
///
/// `increment` must be atomic with respect to concurrent calls for the same
/// key: two requests arriving at `count = limit - 1` must observe distinct
/// post-increment counts.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(
        &self,
        key: &AttemptKey,
        window: Duration,
    ) -> Result<WindowSnapshot, CounterError>;

    async fn clear(&self, key: &AttemptKey) -> Result<(), CounterError>;
}

/// Postgres-backed counter store.
#[derive(Debug, Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

// Window reset and increment are decided inside the statement so the
// read-compare-increment sequence is one round trip.
const INCREMENT_SQL: &str = r"
    INSERT INTO login_attempts (client_ip, email_digest, count, window_started_at)
    VALUES ($1, $2, 1, NOW())
    ON CONFLICT (client_ip, email_digest) DO UPDATE
    SET count = CASE
            WHEN login_attempts.window_started_at <= NOW() - $3::interval THEN 1
            ELSE login_attempts.count + 1
        END,
        window_started_at = CASE
            WHEN login_attempts.window_started_at <= NOW() - $3::interval THEN NOW()
            ELSE login_attempts.window_started_at
        END
    RETURNING count, window_started_at
";

const CLEAR_SQL: &str = "DELETE FROM login_attempts WHERE client_ip = $1 AND email_digest = $2";

impl PgCounterStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn increment(
        &self,
        key: &AttemptKey,
        window: Duration,
    ) -> Result<WindowSnapshot, CounterError> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let row = sqlx::query(INCREMENT_SQL)
            .bind(key.client_ip())
            .bind(key.email_digest())
            .bind(format!("{} seconds", window.as_secs()))
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to increment attempt counter: {err}");
                CounterError::Unavailable(err.to_string())
            })?;

        Ok(WindowSnapshot {
            count: row.get("count"),
            window_started_at: row.get("window_started_at"),
        })
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), CounterError> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE"
        );
        sqlx::query(CLEAR_SQL)
            .bind(key.client_ip())
            .bind(key.email_digest())
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                error!("Failed to clear attempt counter: {err}");
                CounterError::Unavailable(err.to_string())
            })?;

        Ok(())
    }
}

/// In-memory counter store for tests and single-instance local runs.
///
/// The map lock makes each increment atomic, matching the contract of the
/// Postgres statement.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<AttemptKey, WindowSnapshot>>,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(
        &self,
        key: &AttemptKey,
        window: Duration,
    ) -> Result<WindowSnapshot, CounterError> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(key.clone())
            .and_modify(|snapshot| {
                let expired = now
                    .signed_duration_since(snapshot.window_started_at)
                    .to_std()
                    .map_or(false, |elapsed| elapsed >= window);
                if expired {
                    snapshot.count = 1;
                    snapshot.window_started_at = now;
                } else {
                    snapshot.count += 1;
                }
            })
            .or_insert(WindowSnapshot {
                count: 1,
                window_started_at: now,
            });

        Ok(*entry)
    }

    async fn clear(&self, key: &AttemptKey) -> Result<(), CounterError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
