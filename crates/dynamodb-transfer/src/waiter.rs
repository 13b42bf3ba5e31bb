//! Bounded polling primitive shared by export and import waiting
//!
//! The [`Waiter`] knows nothing about jobs: it only produces a sequence of
//! attempts, sleeping a fixed delay between them and failing with
//! [`TransferError::Timeout`] once the deadline is crossed. The job-specific
//! wait loops drive it through the [`PolledJob`] capability trait.
//!
//! The polling loop is sequential: the caller's task is occupied for the
//! duration of the wait, and the only cancellation is the timeout itself.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{Result, TransferError};

/// Fixed-delay, total-timeout polling configuration.
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    delay: Duration,
    timeout: Duration,
    instant_first: bool,
}

impl Waiter {
    /// Create a waiter with the given delay between attempts and total timeout.
    /// The first attempt is instant by default.
    pub fn new(delay: Duration, timeout: Duration) -> Self {
        Self {
            delay,
            timeout,
            instant_first: true,
        }
    }

    /// Whether the first attempt is yielded immediately instead of after one delay.
    pub fn instant_first(mut self, instant: bool) -> Self {
        self.instant_first = instant;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start the attempt sequence. The deadline clock starts here.
    pub fn start(&self) -> Polling {
        let now = Instant::now();
        Polling {
            delay: self.delay,
            timeout: self.timeout,
            started: now,
            deadline: now + self.timeout,
            attempt: 0,
            instant_pending: self.instant_first,
        }
    }
}

/// One yielded polling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Time elapsed since the sequence started.
    pub elapsed: Duration,
}

/// In-flight attempt sequence produced by [`Waiter::start`].
///
/// The sequence is unbounded in attempt count; it ends only when the consumer
/// stops calling [`Polling::next_attempt`] or when the deadline is crossed, in
/// which case the next call returns [`TransferError::Timeout`]. If the next
/// full delay would overshoot the deadline, only the remainder is slept before
/// the timeout is surfaced, so a timeout shorter than a single delay still
/// reports as a timeout rather than hanging for the full delay.
#[derive(Debug)]
pub struct Polling {
    delay: Duration,
    timeout: Duration,
    started: Instant,
    deadline: Instant,
    attempt: u32,
    instant_pending: bool,
}

impl Polling {
    /// Sleep until the next attempt is due and yield it, or fail with
    /// [`TransferError::Timeout`] once the deadline is crossed.
    pub async fn next_attempt(&mut self) -> Result<Attempt> {
        if self.instant_pending {
            self.instant_pending = false;
            self.attempt = 1;
            return Ok(Attempt {
                number: 1,
                elapsed: Duration::ZERO,
            });
        }

        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining <= self.delay {
            // A full delay would land on or past the deadline.
            sleep(remaining).await;
            return Err(TransferError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            });
        }

        sleep(self.delay).await;
        self.attempt += 1;
        Ok(Attempt {
            number: self.attempt,
            elapsed: self.started.elapsed(),
        })
    }
}

/// Capability surface a job record exposes to the generic wait loop.
///
/// Export and import jobs have distinct status enumerations; the waiter only
/// needs the predicates and the failure message, never a concrete job type.
pub trait PolledJob {
    /// Opaque job handle issued by the service.
    fn handle(&self) -> &str;

    /// Current status as the service spells it.
    fn status_str(&self) -> &str;

    /// Terminal success.
    fn is_successful(&self) -> bool;

    /// Terminal failure, cancellation, or cancellation in progress.
    fn has_failed(&self) -> bool;

    /// Service-reported failure message, when present.
    fn failure_message(&self) -> Option<&str>;
}

/// Drive a waiter against a `describe` closure until the job reaches a
/// terminal status or the waiter times out.
///
/// Returns the detailed record on success. A failed or cancelled job yields
/// [`TransferError::JobFailed`] with the service-reported message; a handle
/// the service no longer knows yields [`TransferError::UnknownJob`]; a waiter
/// timeout propagates unchanged. Progress is reported through `tracing` only
/// and never affects the return contract.
pub async fn wait_for_job<J, F, Fut>(waiter: &Waiter, handle: &str, describe: F) -> Result<J>
where
    J: PolledJob,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<J>>>,
{
    let mut polling = waiter.start();
    loop {
        let attempt = polling.next_attempt().await?;
        debug!(
            handle,
            attempt = attempt.number,
            elapsed_secs = attempt.elapsed.as_secs(),
            "polling job status"
        );

        let Some(job) = describe().await? else {
            return Err(TransferError::UnknownJob {
                handle: handle.to_string(),
            });
        };

        if job.is_successful() {
            info!(
                handle,
                attempts = attempt.number,
                elapsed_secs = attempt.elapsed.as_secs(),
                "job completed"
            );
            return Ok(job);
        }
        if job.has_failed() {
            return Err(TransferError::JobFailed {
                handle: handle.to_string(),
                status: job.status_str().to_string(),
                message: job.failure_message().unwrap_or_default().to_string(),
            });
        }
        // Still in progress, keep polling.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_instant_first_attempt() {
        let waiter = Waiter::new(Duration::from_secs(10), Duration::from_secs(25));
        let mut polling = waiter.start();

        let first = polling.next_attempt().await.unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(first.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_schedule_and_timeout() {
        // delay=10, timeout=25, instant: attempts land at 0/10/20 and the
        // fourth attempt fails with Timeout at the 25s deadline.
        let waiter = Waiter::new(Duration::from_secs(10), Duration::from_secs(25));
        let mut polling = waiter.start();

        let a1 = polling.next_attempt().await.unwrap();
        assert_eq!((a1.number, a1.elapsed.as_secs()), (1, 0));

        let a2 = polling.next_attempt().await.unwrap();
        assert_eq!((a2.number, a2.elapsed.as_secs()), (2, 10));

        let a3 = polling.next_attempt().await.unwrap();
        assert_eq!((a3.number, a3.elapsed.as_secs()), (3, 20));

        let start = Instant::now();
        let err = polling.next_attempt().await.unwrap_err();
        assert!(err.is_timeout());
        // Only the 5s remainder is slept, never the full delay.
        assert_eq!(start.elapsed().as_secs(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sleep_overshooting_deadline_is_a_timeout() {
        // Not instant, timeout shorter than one delay: the very first sleep
        // crosses the deadline and must surface as Timeout.
        let waiter =
            Waiter::new(Duration::from_secs(10), Duration::from_secs(5)).instant_first(false);
        let mut polling = waiter.start();

        let start = Instant::now();
        let err = polling.next_attempt().await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(start.elapsed().as_secs(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_instant_first_attempt_after_delay() {
        let waiter =
            Waiter::new(Duration::from_secs(3), Duration::from_secs(60)).instant_first(false);
        let mut polling = waiter.start();

        let first = polling.next_attempt().await.unwrap();
        assert_eq!((first.number, first.elapsed.as_secs()), (1, 3));
    }
}
