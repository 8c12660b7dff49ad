//! Retry with bounded exponential backoff.
//!
//! The executor runs an async operation until it succeeds, fails fatally,
//! or exhausts the policy's retry budget. The operation itself decides
//! whether a failure is retryable by returning the matching [`Outcome`].
//!
//! # State machine
//!
//! ```text
//! Attempting(n) ──Ok──────────────────────────────→ Succeeded
//!      │        ──Settled─────────────────────────→ Succeeded (settled)
//!      │        ──Fail────────────────────────────→ FailedFatal
//!      │        ──Retryable, n > max_retries──────→ FailedExhausted
//!      └──────────Retryable, n ≤ max_retries──wait→ Attempting(n+1)
//! ```
//!
//! The wait is `retry_after` when the outcome carries one, otherwise
//! `clamp(min_delay * factor^(n-1), min_delay, max_delay)`.
//!
//! Attempts within one execution are strictly sequential. Independent
//! executions share nothing and may run concurrently.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ExecError, ExecResult};

// =============================================================================
// Policy
// =============================================================================

/// Bounded exponential backoff parameters.
///
/// # Invariants
/// - `min_delay <= max_delay`
/// - `factor` is a number (a factor ≤ 1 yields constant `min_delay` spacing)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    factor: f64,
    min_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// # Errors
    /// Returns `ExecError::Config` if `min_delay > max_delay` or `factor` is NaN.
    pub fn new(
        max_retries: u32,
        factor: f64,
        min_delay: Duration,
        max_delay: Duration,
    ) -> ExecResult<Self> {
        if min_delay > max_delay {
            return Err(ExecError::Config(format!(
                "Retry min delay ({:?}) exceeds max delay ({:?})",
                min_delay, max_delay
            )));
        }

        if factor.is_nan() {
            return Err(ExecError::Config("Retry factor must be a number".to_string()));
        }

        Ok(Self { max_retries, factor, min_delay, max_delay })
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            factor: 1.0,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Backoff to wait after attempt `attempt` (1-based) failed.
    ///
    /// # Examples
    /// ```
    /// # use std::time::Duration;
    /// # use tradegate_exec::RetryPolicy;
    /// let policy = RetryPolicy::default(); // factor 1.5, 1s..8s
    /// assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(2250));
    /// assert_eq!(policy.delay_for(20), Duration::from_millis(8000));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // No growth: constant spacing, whatever the sign of the factor
        if self.factor <= 1.0 {
            return self.min_delay;
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.min_delay.as_secs_f64() * self.factor.powi(exponent);

        if scaled.is_nan() || scaled <= self.min_delay.as_secs_f64() {
            return self.min_delay;
        }
        if scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }

        Duration::from_secs_f64(scaled)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 30,
            factor: 1.5,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a single attempt, as judged by the operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    /// Success with a payload
    Ok(T),
    /// Non-retryable failure
    Fail(E),
    /// Not an error: the work is already in the requested state.
    /// Ends the execution without further attempts.
    Settled(E),
    /// Transient failure, eligible for another attempt
    Retryable {
        /// What went wrong
        reason: E,
        /// Explicit wait before the next attempt, overriding the backoff
        retry_after: Option<Duration>,
    },
}

impl<T, E> Outcome<T, E> {
    /// Retryable failure using the policy's backoff.
    pub fn retryable(reason: E) -> Self {
        Outcome::Retryable { reason, retry_after: None }
    }

    /// Retryable failure with an explicit wait.
    pub fn retry_after(reason: E, delay: Duration) -> Self {
        Outcome::Retryable { reason, retry_after: Some(delay) }
    }
}

/// Successful end of an execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T, E> {
    /// The operation produced a value
    Value(T),
    /// The operation reported the work as already done
    Settled(E),
}

impl<T, E> Completion<T, E> {
    /// The value, if the operation produced one.
    pub fn into_value(self) -> Option<T> {
        match self {
            Completion::Value(value) => Some(value),
            Completion::Settled(_) => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Completion::Settled(_))
    }
}

/// Failed end of an execution.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    /// The operation reported a non-retryable failure
    #[error("Operation failed on attempt {attempts}: {reason}")]
    Fatal { reason: E, attempts: u32 },

    /// Every attempt allowed by the policy was retryable
    #[error("Retries exhausted after {attempts} attempts (last error: {last})")]
    Exhausted { attempts: u32, last: E },

    /// Cancelled before an attempt or during a backoff wait
    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E>
where
    E: fmt::Debug + fmt::Display,
{
    /// Number of attempts made before the execution ended.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal { attempts, .. }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Runs operations under a fixed [`RetryPolicy`].
///
/// The executor holds no per-call state; one instance can serve any number
/// of concurrent executions.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor for a policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails fatally or runs out of retries.
    ///
    /// `label` names the operation in logs.
    pub async fn execute<T, E, F, Fut>(
        &self,
        label: &str,
        operation: F,
    ) -> Result<Completion<T, E>, RetryError<E>>
    where
        E: fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
    {
        self.run(label, operation, None).await
    }

    /// Like [`execute`](Self::execute), but stops when `cancel` fires.
    ///
    /// The token is checked before every attempt and interrupts backoff
    /// waits. An attempt already in flight is not interrupted.
    pub async fn execute_with_cancel<T, E, F, Fut>(
        &self,
        label: &str,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<Completion<T, E>, RetryError<E>>
    where
        E: fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
    {
        self.run(label, operation, Some(cancel)).await
    }

    async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<Completion<T, E>, RetryError<E>>
    where
        E: fmt::Debug + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Outcome<T, E>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                info!(operation = label, attempts = attempt, "Cancelled before attempt");
                return Err(RetryError::Cancelled { attempts: attempt });
            }

            attempt = attempt.saturating_add(1);
            debug!(operation = label, attempt, "Attempting");

            match operation().await {
                Outcome::Ok(value) => {
                    if attempt > 1 {
                        info!(operation = label, attempt, "Succeeded after retries");
                    }
                    return Ok(Completion::Value(value));
                },
                Outcome::Settled(reason) => {
                    info!(operation = label, attempt, %reason, "Settled without error");
                    return Ok(Completion::Settled(reason));
                },
                Outcome::Fail(reason) => {
                    error!(operation = label, attempt, error = %reason, "Fatal failure");
                    return Err(RetryError::Fatal { reason, attempts: attempt });
                },
                Outcome::Retryable { reason, retry_after } => {
                    if attempt > self.policy.max_retries {
                        warn!(operation = label, attempts = attempt, error = %reason, "Retries exhausted");
                        return Err(RetryError::Exhausted { attempts: attempt, last: reason });
                    }

                    let delay = retry_after.unwrap_or_else(|| self.policy.delay_for(attempt));
                    warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        explicit = retry_after.is_some(),
                        error = %reason,
                        "Retryable failure, backing off"
                    );

                    match cancel {
                        Some(token) => {
                            tokio::select! {
                                _ = sleep(delay) => {},
                                _ = token.cancelled() => {
                                    info!(operation = label, attempts = attempt, "Cancelled during backoff");
                                    return Err(RetryError::Cancelled { attempts: attempt });
                                }
                            }
                        },
                        None => sleep(delay).await,
                    }
                },
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 1.5, Duration::from_millis(1000), Duration::from_millis(8000))
            .unwrap()
    }

    #[test]
    fn test_policy_rejects_inverted_delays() {
        let result = RetryPolicy::new(3, 2.0, Duration::from_secs(5), Duration::from_secs(1));
        assert!(matches!(result, Err(ExecError::Config(_))));
    }

    #[test]
    fn test_policy_rejects_nan_factor() {
        let result = RetryPolicy::new(3, f64::NAN, Duration::from_secs(1), Duration::from_secs(5));
        assert!(result.is_err());
    }

    #[test]
    fn test_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 30);
        assert_eq!(policy.factor(), 1.5);
        assert_eq!(policy.min_delay(), Duration::from_secs(1));
        assert_eq!(policy.max_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_growth() {
        let policy = policy(10);
        let delays: Vec<u128> = (1..=4).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![1000, 1500, 2250, 3375]);
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let policy = policy(10);
        assert_eq!(policy.delay_for(6), Duration::from_micros(7_593_750));
        assert_eq!(policy.delay_for(7), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(8000));
    }

    #[test]
    fn test_factor_at_or_below_one_is_constant() {
        for factor in [1.0, 0.5, 0.0, -2.0] {
            let policy =
                RetryPolicy::new(5, factor, Duration::from_millis(250), Duration::from_secs(2)).unwrap();
            for attempt in 1..=6 {
                assert_eq!(policy.delay_for(attempt), Duration::from_millis(250), "factor={factor}");
            }
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let executor = RetryExecutor::new(policy(3));
        let result = executor
            .execute("ok", || async { Outcome::<_, String>::Ok(42) })
            .await
            .unwrap();
        assert_eq!(result, Completion::Value(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound() {
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("always-retryable", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Outcome::<(), _>::retryable("busy".to_string()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last, "busy");
            },
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let executor = RetryExecutor::new(RetryPolicy::no_retries());
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("once", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Outcome::<(), _>::retryable("busy".to_string()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().attempts(), 1);
    }

    #[tokio::test]
    async fn test_fatal_short_circuits() {
        let executor = RetryExecutor::new(policy(5));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("fatal", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Outcome::<(), _>::Fail("rejected".to_string()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Fatal { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_settled_is_not_an_error() {
        let executor = RetryExecutor::new(policy(5));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("settled", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Outcome::<u32, _>::Settled("already cancelled".to_string()) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_settled());
        assert_eq!(result.into_value(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_computed_delays_between_attempts() {
        let executor = RetryExecutor::new(policy(4));
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let _ = executor
            .execute("timed", || {
                stamps.lock().unwrap().push(Instant::now());
                async { Outcome::<(), _>::retryable("busy".to_string()) }
            })
            .await;

        let stamps = stamps.lock().unwrap();
        let gaps: Vec<u128> = stamps.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
        assert_eq!(gaps, vec![1000, 1500, 2250, 3375]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_delay_overrides_backoff() {
        let executor = RetryExecutor::new(policy(3));
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("rate-limited", || {
                stamps.lock().unwrap().push(Instant::now());
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Outcome::retry_after("429".to_string(), Duration::from_millis(12_345))
                    } else {
                        Outcome::Ok("done")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, Completion::Value("done"));
        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps[1] - stamps[0], Duration::from_millis(12_345));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let executor = RetryExecutor::new(policy(3));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Outcome::retryable(format!("timeout #{n}"))
                    } else {
                        Outcome::Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, Completion::Value(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let executor = RetryExecutor::new(policy(3));
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);

        let result = executor
            .execute_with_cancel(
                "cancelled",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Outcome::<(), String>::Ok(()) }
                },
                &token,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 0 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let executor = RetryExecutor::new(
            RetryPolicy::new(3, 2.0, Duration::from_secs(60), Duration::from_secs(600)).unwrap(),
        );
        let token = CancellationToken::new();
        let canceller = token.clone();

        tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result = executor
            .execute_with_cancel(
                "slow-backoff",
                || async { Outcome::<(), _>::retryable("busy".to_string()) },
                &token,
            )
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_executions_run_concurrently() {
        let executor = RetryExecutor::new(policy(1));

        let slow = executor.execute("slow", || async {
            sleep(Duration::from_secs(3)).await;
            Outcome::<_, String>::Ok("slow")
        });
        let fast = executor.execute("fast", || async { Outcome::<_, String>::Ok("fast") });

        let started = Instant::now();
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), Completion::Value("slow"));
        assert_eq!(fast.unwrap(), Completion::Value("fast"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
