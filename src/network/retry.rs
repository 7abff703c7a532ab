//! Retry policy: classification, exponential backoff and jitter
//!
//! Before retry `n` (the index of the attempt that just failed, starting at 0) the executor
//! waits `base_delay * 2^n` plus a jitter of at most [`JITTER_RATIO`] of that delay.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::Error;

/// Largest jitter as a fraction of the scheduled delay
pub const JITTER_RATIO: f64 = 0.10;

/// Caller-supplied replacement for kind-based retryability: `(error, attempt) -> retry?`
pub type RetryPredicate = Arc<dyn Fn(&Error, u32) -> bool + Send + Sync>;

/// Outcome of classifying one failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub reason: String,
}

impl RetryDecision {
    fn retry(reason: impl Into<String>) -> Self {
        Self {
            retry: true,
            reason: reason.into(),
        }
    }

    fn stop(reason: impl Into<String>) -> Self {
        Self {
            retry: false,
            reason: reason.into(),
        }
    }
}

/// Decide whether the failed attempt `attempt` (0-based) gets another try
pub fn decide(
    error: &Error,
    attempt: u32,
    max_retries: u32,
    predicate: Option<&RetryPredicate>,
) -> RetryDecision {
    let kind = error.kind();

    let retryable = match predicate {
        Some(predicate) => predicate(error, attempt),
        None => kind.is_retryable(),
    };

    if !retryable {
        return match predicate {
            Some(_) => RetryDecision::stop(format!("retry predicate rejected {}", kind)),
            None => RetryDecision::stop(format!("{} is not retryable", kind)),
        };
    }

    if attempt >= max_retries {
        return RetryDecision::stop(format!(
            "retry budget of {} exhausted after {}",
            max_retries, kind
        ));
    }

    RetryDecision::retry(format!("{} is retryable", kind))
}

/// Scheduled delay before retry `attempt`, without jitter
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    if base_delay.is_zero() {
        return Duration::ZERO;
    }

    let nanos = 1u128
        .checked_shl(attempt)
        .map_or(u128::MAX, |factor| base_delay.as_nanos().saturating_mul(factor));

    u64::try_from(nanos / 1_000_000_000)
        .map(|secs| Duration::new(secs, (nanos % 1_000_000_000) as u32))
        .unwrap_or(Duration::MAX)
}

/// Upper bound of the jitter added to `delay`
pub fn max_jitter(delay: Duration) -> Duration {
    delay.mul_f64(JITTER_RATIO)
}

/// Source of randomized backoff smoothing
pub trait JitterSource: Send + Sync + std::fmt::Debug {
    /// A duration in `[0, max]`
    fn jitter(&self, max: Duration) -> Duration;
}

/// Uniform jitter from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        let max_nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
        if max_nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..=max_nanos))
    }
}

/// Jitter that is always a fixed fraction of the bound
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter {
    fraction: f64,
}

impl FixedJitter {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// No jitter at all
    pub fn none() -> Self {
        Self::new(0.0)
    }
}

impl JitterSource for FixedJitter {
    fn jitter(&self, max: Duration) -> Duration {
        max.mul_f64(self.fraction)
    }
}

/// Full delay before retry `attempt`, jitter clamped to its bound
pub fn delay_with_jitter(base_delay: Duration, attempt: u32, source: &dyn JitterSource) -> Duration {
    let delay = backoff_delay(base_delay, attempt);
    let bound = max_jitter(delay);
    delay.saturating_add(source.jitter(bound).min(bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BASE: Duration = Duration::from_millis(1000);

    #[rstest]
    #[case(0, 1000)]
    #[case(1, 2000)]
    #[case(2, 4000)]
    #[case(3, 8000)]
    #[case(6, 64_000)]
    fn test_backoff_doubles(#[case] attempt: u32, #[case] millis: u64) {
        assert_eq!(backoff_delay(BASE, attempt), Duration::from_millis(millis));
    }

    #[test]
    fn test_backoff_saturates() {
        assert_eq!(backoff_delay(BASE, 200), Duration::MAX);
    }

    #[test]
    fn test_jitter_bounds_with_deterministic_source() {
        for attempt in 0..6 {
            let scheduled = backoff_delay(BASE, attempt);

            let low = delay_with_jitter(BASE, attempt, &FixedJitter::none());
            assert_eq!(low, scheduled);

            let high = delay_with_jitter(BASE, attempt, &FixedJitter::new(1.0));
            assert_eq!(high, scheduled + scheduled / 10);
        }
    }

    #[derive(Debug)]
    struct OverflowingJitter;

    impl JitterSource for OverflowingJitter {
        fn jitter(&self, max: Duration) -> Duration {
            max * 5
        }
    }

    #[test]
    fn test_jitter_is_clamped() {
        let delay = delay_with_jitter(BASE, 1, &OverflowingJitter);
        assert_eq!(delay, Duration::from_millis(2200));
    }

    #[test]
    fn test_random_jitter_within_bound() {
        let source = RandomJitter;
        for attempt in 0..5 {
            let scheduled = backoff_delay(BASE, attempt);
            for _ in 0..100 {
                let delay = delay_with_jitter(BASE, attempt, &source);
                assert!(delay >= scheduled);
                assert!(delay <= scheduled + max_jitter(scheduled));
            }
        }
        assert_eq!(source.jitter(Duration::ZERO), Duration::ZERO);
    }

    #[rstest]
    #[case(Error::transport("reset"), true)]
    #[case(Error::http(503, "unavailable", ""), true)]
    #[case(Error::http(429, "slow down", ""), true)]
    #[case(Error::http(408, "request timeout", ""), true)]
    #[case(Error::http(403, "forbidden", ""), false)]
    #[case(Error::timeout(Duration::from_secs(10)), false)]
    #[case(Error::protocol_decode("bad tag"), false)]
    #[case(Error::invalid_response("missing field"), false)]
    fn test_decide_by_kind(#[case] error: Error, #[case] retry: bool) {
        assert_eq!(decide(&error, 0, 3, None).retry, retry);
    }

    #[test]
    fn test_decide_respects_budget() {
        let error = Error::http(500, "boom", "");
        assert!(decide(&error, 2, 3, None).retry);

        let decision = decide(&error, 3, 3, None);
        assert!(!decision.retry);
        assert!(decision.reason.contains("exhausted"));

        assert!(!decide(&error, 0, 0, None).retry);
    }

    #[test]
    fn test_predicate_overrides_kind() {
        let only_404: RetryPredicate = Arc::new(|err, _| err.status() == Some(404));

        assert!(decide(&Error::http(404, "", ""), 0, 2, Some(&only_404)).retry);

        let decision = decide(&Error::http(503, "", ""), 0, 2, Some(&only_404));
        assert!(!decision.retry);
        assert!(decision.reason.contains("predicate"));

        // Budget still applies
        assert!(!decide(&Error::http(404, "", ""), 2, 2, Some(&only_404)).retry);
    }
}
