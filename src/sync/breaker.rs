//! Per-transport circuit breaker for the hybrid sync client.
//!
//! Mirrors the reference client's state machine: `closed` → `open` after
//! `failure_threshold` consecutive failures, `open` → `half_open` once
//! `reset_timeout_seconds` has elapsed since `opened_at_utc`, and a single
//! failure in `half_open` reopens immediately.

use crate::error::{SyncError, SyncResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_RESET_TIMEOUT_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "open" => BreakerState::Open,
            "half_open" => BreakerState::HalfOpen,
            _ => BreakerState::Closed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub opened_at_utc: Option<String>,
}

/// In-memory breaker; `now_utc` is injected by the caller so reopening logic
/// stays deterministic and testable without touching wall-clock time.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    state: BreakerState,
    failure_count: u32,
    opened_at_utc: Option<String>,
    failure_threshold: u32,
    reset_timeout_secs: f64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: BreakerState::Closed,
            failure_count: 0,
            opened_at_utc: None,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_secs: DEFAULT_RESET_TIMEOUT_SECS,
        }
    }

    pub fn with_thresholds(mut self, failure_threshold: u32, reset_timeout_secs: f64) -> Self {
        self.failure_threshold = failure_threshold;
        self.reset_timeout_secs = reset_timeout_secs;
        self
    }

    pub fn from_persisted(
        name: impl Into<String>,
        state: BreakerState,
        failure_count: u32,
        opened_at_utc: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            state,
            failure_count,
            opened_at_utc,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout_secs: DEFAULT_RESET_TIMEOUT_SECS,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            opened_at_utc: self.opened_at_utc.clone(),
        }
    }

    /// Returns whether a request may proceed given the current wall-clock
    /// time `now`. Transitions `open` → `half_open` in place when the reset
    /// timeout has elapsed.
    pub fn allow_request(&mut self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.state {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = self
                    .opened_at_utc
                    .as_deref()
                    .and_then(|s| s.parse::<chrono::DateTime<chrono::Utc>>().ok())
                    .map(|opened| (now - opened).num_milliseconds() as f64 / 1000.0)
                    .unwrap_or(f64::INFINITY);
                if elapsed >= self.reset_timeout_secs {
                    self.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn retry_after_secs(&self, now: chrono::DateTime<chrono::Utc>) -> f64 {
        let Some(opened_at) = self
            .opened_at_utc
            .as_deref()
            .and_then(|s| s.parse::<chrono::DateTime<chrono::Utc>>().ok())
        else {
            return 0.0;
        };
        let elapsed = (now - opened_at).num_milliseconds() as f64 / 1000.0;
        (self.reset_timeout_secs - elapsed).max(0.0)
    }

    pub fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.failure_count = 0;
        self.opened_at_utc = None;
    }

    pub fn record_failure(&mut self, now: chrono::DateTime<chrono::Utc>) {
        match self.state {
            BreakerState::HalfOpen => {
                self.failure_count = self.failure_threshold;
                self.state = BreakerState::Open;
                self.opened_at_utc = Some(now.to_rfc3339());
            }
            BreakerState::Closed | BreakerState::Open => {
                self.failure_count += 1;
                if self.failure_count >= self.failure_threshold {
                    self.state = BreakerState::Open;
                    if self.opened_at_utc.is_none() {
                        self.opened_at_utc = Some(now.to_rfc3339());
                    }
                }
            }
        }
    }

    pub fn check(&mut self, now: chrono::DateTime<chrono::Utc>) -> SyncResult<()> {
        if self.allow_request(now) {
            Ok(())
        } else {
            Err(SyncError::CircuitOpen {
                retry_after_secs: self.retry_after_secs(now),
            })
        }
    }

    pub fn load(conn: &Connection, name: &str) -> SyncResult<Self> {
        let row: Option<(String, u32, Option<String>)> = conn
            .query_row(
                "SELECT state, consecutive_failures, opened_at_utc FROM circuit_breaker_state WHERE breaker_name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(match row {
            Some((state, failures, opened_at)) => {
                Self::from_persisted(name, BreakerState::parse(&state), failures, opened_at)
            }
            None => Self::new(name),
        })
    }

    pub fn persist(&self, conn: &Connection) -> SyncResult<()> {
        conn.execute(
            "INSERT INTO circuit_breaker_state (breaker_name, state, consecutive_failures, opened_at_utc, updated_at_utc)
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
             ON CONFLICT(breaker_name) DO UPDATE SET
                state = excluded.state,
                consecutive_failures = excluded.consecutive_failures,
                opened_at_utc = excluded.opened_at_utc,
                updated_at_utc = CURRENT_TIMESTAMP",
            params![
                self.name,
                self.state.as_str(),
                self.failure_count,
                self.opened_at_utc,
            ],
        )
        .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn opens_after_threshold_failures() {
        let mut breaker = CircuitBreaker::new("push");
        let now = Utc::now();
        breaker.record_failure(now);
        breaker.record_failure(now);
        assert_eq!(breaker.snapshot().state, BreakerState::Closed);
        breaker.record_failure(now);
        assert_eq!(breaker.snapshot().state, BreakerState::Open);
        assert!(!breaker.allow_request(now));
    }

    #[test]
    fn transitions_to_half_open_after_timeout_and_reopens_on_failure() {
        let mut breaker = CircuitBreaker::new("push");
        let now = Utc::now();
        for _ in 0..3 {
            breaker.record_failure(now);
        }
        assert_eq!(breaker.snapshot().state, BreakerState::Open);

        let later = now + Duration::seconds(11);
        assert!(breaker.allow_request(later));
        assert_eq!(breaker.snapshot().state, BreakerState::HalfOpen);

        breaker.record_failure(later);
        assert_eq!(breaker.snapshot().state, BreakerState::Open);
        assert_eq!(breaker.snapshot().failure_count, 3);
    }

    #[test]
    fn success_resets_breaker() {
        let mut breaker = CircuitBreaker::new("push");
        let now = Utc::now();
        breaker.record_failure(now);
        breaker.record_success();
        let snap = breaker.snapshot();
        assert_eq!(snap.state, BreakerState::Closed);
        assert_eq!(snap.failure_count, 0);
    }
}
