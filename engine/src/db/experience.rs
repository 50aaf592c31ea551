/// Experience log persistence operations
///
/// A capacity-bounded, insertion-ordered append log of exploit attempts.
/// Appends are single INSERT statements; the database's own atomicity is
/// the only synchronization between concurrent mission writers. Reads are
/// snapshots that may trail in-flight appends; analytics consumers treat
/// them as advisory.
use crate::learning::attempt::ExploitAttempt;
use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::warn;

/// Default bound on retained attempts
pub const DEFAULT_CAPACITY: u32 = 10_000;

/// Lookahead multiplier for filtered reads: a filtered fetch of n records
/// scans at most this many times n recent rows
const LOOKAHEAD_FACTOR: u32 = 2;

/// Experience store repository
pub struct ExperienceStore {
    pool: SqlitePool,
    capacity: u32,
    lookahead: u32,
}

impl ExperienceStore {
    /// Create a new store over the given pool, retaining at most
    /// `capacity` records
    pub fn new(pool: SqlitePool, capacity: u32) -> Self {
        Self {
            pool,
            capacity,
            lookahead: LOOKAHEAD_FACTOR,
        }
    }

    /// Override the lookahead multiplier used by filtered reads
    pub fn with_lookahead(mut self, lookahead: u32) -> Self {
        self.lookahead = lookahead.max(1);
        self
    }

    /// Append an attempt to the log.
    ///
    /// The insert is immediately durable. Once the log exceeds capacity,
    /// the oldest rows are evicted in strict insertion (FIFO) order.
    pub async fn add(&self, attempt: &ExploitAttempt) -> Result<()> {
        let payload =
            serde_json::to_string(attempt).context("Failed to serialize attempt")?;

        sqlx::query(
            "INSERT INTO experience (attempt_id, payload, created_at) VALUES (?, ?, ?)",
        )
        .bind(&attempt.attempt_id)
        .bind(&payload)
        .bind(attempt.timestamp.timestamp())
        .execute(&self.pool)
        .await
        .context("Failed to append attempt")?;

        sqlx::query(
            "DELETE FROM experience
             WHERE seq <= (SELECT MAX(seq) FROM experience) - ?",
        )
        .bind(self.capacity as i64)
        .execute(&self.pool)
        .await
        .context("Failed to evict old attempts")?;

        tracing::debug!(attempt_id = attempt.attempt_id.as_str(), "Attempt recorded");
        Ok(())
    }

    /// Get the n most recent attempts, most recent first.
    ///
    /// Rows whose payload fails to parse are skipped with a warning; a
    /// damaged record never aborts a read.
    pub async fn get_recent(&self, n: u32) -> Result<Vec<ExploitAttempt>> {
        let rows = sqlx::query("SELECT payload FROM experience ORDER BY seq DESC LIMIT ?")
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch recent attempts")?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.get("payload");
            match serde_json::from_str::<ExploitAttempt>(&payload) {
                Ok(attempt) => attempts.push(attempt),
                Err(e) => warn!(error = %e, "Skipping malformed attempt record"),
            }
        }

        Ok(attempts)
    }

    /// Get up to n recent attempts matching a predicate, most recent first.
    ///
    /// Bounded lookahead: only the `lookahead * n` most recent records are
    /// scanned, so this may under-return when matches are sparse. That is
    /// the intended trade: filtered reads stay O(n) regardless of log size.
    pub async fn get_matching<F>(&self, n: u32, predicate: F) -> Result<Vec<ExploitAttempt>>
    where
        F: Fn(&ExploitAttempt) -> bool,
    {
        let scanned = self.get_recent(n.saturating_mul(self.lookahead)).await?;

        Ok(scanned
            .into_iter()
            .filter(|a| predicate(a))
            .take(n as usize)
            .collect())
    }

    /// Get recent attempts for a specific vulnerability type
    pub async fn get_by_vulnerability(
        &self,
        vuln_type: &str,
        n: u32,
    ) -> Result<Vec<ExploitAttempt>> {
        self.get_matching(n, |a| a.vulnerability_type == vuln_type)
            .await
    }

    /// Get recent successful attempts
    pub async fn get_successful(&self, n: u32) -> Result<Vec<ExploitAttempt>> {
        use crate::learning::attempt::Outcome;
        self.get_matching(n, |a| a.outcome == Outcome::Success).await
    }

    /// Number of retained attempts
    pub async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM experience")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count attempts")?;

        Ok(count as u64)
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
