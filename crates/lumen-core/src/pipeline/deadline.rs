//! Cooperative time budget for a single pipeline run.
//!
//! Stages poll the deadline between steps and inside long loops, so a run
//! that overshoots its budget stops on its own instead of occupying a
//! blocking thread after the caller has given up.

use std::time::{Duration, Instant};

use crate::error::{PipelineError, PipelineResult};

/// Point in time after which pipeline work is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
    timeout_ms: u64,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn unbounded() -> Self {
        Self {
            at: None,
            timeout_ms: 0,
        }
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with [`PipelineError::Timeout`] naming `stage` once expired.
    pub fn check(&self, stage: &str) -> PipelineResult<()> {
        if self.is_expired() {
            return Err(PipelineError::Timeout {
                stage: stage.to_string(),
                timeout_ms: self.timeout_ms,
            });
        }
        Ok(())
    }
}
