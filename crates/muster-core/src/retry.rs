//! Submission retry policy.
//!
//! Attendance submissions are fire-and-forget single attempts by default.
//! Hosts that want resilience opt in through configuration; the policy
//! never queues failed writes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How submission failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Single attempt, no retry. The default.
    #[default]
    None,

    /// Retry with a fixed delay between attempts.
    Fixed {
        /// Total attempts, including the first.
        attempts: u32,
        /// Delay between attempts in milliseconds.
        delay_ms: u64,
    },

    /// Retry with exponentially growing delays (doubling each attempt).
    Exponential {
        /// Total attempts, including the first.
        attempts: u32,
        /// Delay before the first retry in milliseconds.
        initial_delay_ms: u64,
    },
}

impl RetryPolicy {
    /// Total attempts this policy allows, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        match *self {
            Self::None => 1,
            Self::Fixed { attempts, .. } | Self::Exponential { attempts, .. } => {
                // A policy configured with zero attempts still tries once.
                if attempts == 0 {
                    1
                } else {
                    attempts
                }
            }
        }
    }

    /// Delay to wait after `failed_attempts` consecutive failures, or
    /// `None` when the policy is exhausted.
    #[must_use]
    pub fn backoff_after(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts() {
            return None;
        }
        match *self {
            Self::None => None,
            Self::Fixed { delay_ms, .. } => Some(Duration::from_millis(delay_ms)),
            Self::Exponential {
                initial_delay_ms, ..
            } => {
                let factor = 1u64 << (failed_attempts - 1).min(16);
                Some(Duration::from_millis(initial_delay_ms.saturating_mul(factor)))
            }
        }
    }
}
