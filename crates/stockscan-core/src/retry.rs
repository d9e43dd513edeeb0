//! Bounded retry state for scanner initialization.
//!
//! The counter lives here; the delay between attempts is chosen by the caller
//! (the session layer drives it with an exponential backoff).

use crate::MAX_SCANNER_INIT_ATTEMPTS;

/// What to do after a failed initialization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// Try again; `attempt` is the number of the attempt about to run (1-based).
    Retry { attempt: u32 },
    /// The ceiling was reached; the failure is now fatal.
    Exhausted { attempts: u32 },
}

/// Attempt counter with a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitRetry {
    failures: u32,
    max_attempts: u32,
}

impl Default for InitRetry {
    fn default() -> Self {
        InitRetry::new(MAX_SCANNER_INIT_ATTEMPTS)
    }
}

impl InitRetry {
    /// Creates a counter allowing `max_attempts` attempts in total (at least one).
    pub fn new(max_attempts: u32) -> Self {
        InitRetry {
            failures: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Records a failed attempt and decides whether another one is allowed.
    pub fn record_failure(&mut self) -> RetryStep {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.max_attempts {
            RetryStep::Exhausted {
                attempts: self.failures,
            }
        } else {
            RetryStep::Retry {
                attempt: self.failures + 1,
            }
        }
    }

    /// Failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Clears the counter after a successful initialization.
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausts_after_ceiling() {
        let mut retry = InitRetry::default();

        for expected_next in 2..=MAX_SCANNER_INIT_ATTEMPTS {
            assert_eq!(
                retry.record_failure(),
                RetryStep::Retry {
                    attempt: expected_next
                }
            );
        }
        assert_eq!(
            retry.record_failure(),
            RetryStep::Exhausted {
                attempts: MAX_SCANNER_INIT_ATTEMPTS
            }
        );
    }

    #[test]
    fn test_reset_after_success() {
        let mut retry = InitRetry::new(2);
        retry.record_failure();
        retry.reset();

        assert_eq!(retry.failures(), 0);
        assert_eq!(retry.record_failure(), RetryStep::Retry { attempt: 2 });
    }

    #[test]
    fn test_zero_ceiling_allows_one_attempt() {
        let mut retry = InitRetry::new(0);
        assert_eq!(retry.max_attempts(), 1);
        assert_eq!(retry.record_failure(), RetryStep::Exhausted { attempts: 1 });
    }
}
