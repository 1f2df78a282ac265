//! Connection bootstrap and error draining.

use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use workflows::{BrokerError, ConnectionError};

/// How many times to try connecting, and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetrySchedule {
    pub fn new(max_attempts: u32, interval_seconds: u64) -> Self {
        Self {
            max_attempts,
            interval: Duration::from_secs(interval_seconds),
        }
    }
}

impl Default for RetrySchedule {
    /// Ten attempts thirty seconds apart: roughly five minutes.
    fn default() -> Self {
        Self::new(10, 30)
    }
}

/// Opens one broker connection per call.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;

    async fn connect(&self) -> Result<Self::Connection, BrokerError>;
}

/// Connects with bounded retry.
///
/// Makes at most `schedule.max_attempts` attempts (at least one), sleeping
/// `schedule.interval` between consecutive failures but not after the last
/// one. Returns [`ConnectionError::Exhausted`] when every attempt failed; the
/// caller must treat that as fatal. Cancelling `shutdown` aborts the wait
/// between attempts with [`ConnectionError::Cancelled`].
pub async fn connect_with_retry<C: Connector>(
    connector: &C,
    schedule: RetrySchedule,
    shutdown: &CancellationToken,
) -> Result<C::Connection, ConnectionError> {
    let max_attempts = schedule.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if shutdown.is_cancelled() {
            return Err(ConnectionError::Cancelled { attempts: attempt });
        }
        attempt += 1;

        match connector.connect().await {
            Ok(connection) => {
                info!(attempt, "Connected to message queue");
                return Ok(connection);
            }
            Err(e) if attempt >= max_attempts => {
                error!(attempt, error = %e, "Finally failed to initialize message queue manager");
                return Err(ConnectionError::Exhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts,
                    retry_in_seconds = schedule.interval.as_secs(),
                    error = %e,
                    "Failed to initialize message queue manager, retrying"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        return Err(ConnectionError::Cancelled { attempts: attempt });
                    }
                    _ = tokio::time::sleep(schedule.interval) => {}
                }
            }
        }
    }
}

/// Logs every error received on `errors` until the senders are dropped or
/// `lifetime` is cancelled.
///
/// Errors are logged as warnings and never stop the process; a connection
/// failure that matters surfaces on the consumption path as well.
pub fn spawn_error_drain<E>(
    mut errors: mpsc::UnboundedReceiver<E>,
    lifetime: CancellationToken,
) -> JoinHandle<()>
where
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = lifetime.cancelled() => break,
                next = errors.recv() => match next {
                    Some(e) => warn!(error = %e, "Caught error from message queue"),
                    None => break,
                },
            }
        }
        debug!("Message queue error drain stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    /// Fails the first `failures` attempts, then succeeds.
    struct FlakyConnector {
        failures: u32,
        attempts: AtomicU32,
    }

    impl FlakyConnector {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for FlakyConnector {
        type Connection = u32;

        async fn connect(&self) -> Result<u32, BrokerError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                Err(BrokerError::Connect(format!("refused on attempt {attempt}")))
            } else {
                Ok(attempt)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts_with_n_minus_one_waits() {
        let connector = FlakyConnector::new(u32::MAX);
        let schedule = RetrySchedule::new(4, 30);
        let started = Instant::now();

        let result = connect_with_retry(&connector, schedule, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(ConnectionError::Exhausted { attempts: 4, last_error: BrokerError::Connect(_) })
        ));
        assert_eq!(connector.attempts(), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3 * 30));
        assert!(elapsed < Duration::from_secs(3 * 30 + 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let connector = FlakyConnector::new(2);
        let started = Instant::now();

        let connection = connect_with_retry(&connector, RetrySchedule::new(5, 10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(connection, 3);
        assert_eq!(connector.attempts(), 3);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_sleep() {
        let connector = FlakyConnector::new(u32::MAX);
        let started = Instant::now();

        let result = connect_with_retry(&connector, RetrySchedule::new(1, 30), &CancellationToken::new()).await;

        assert!(matches!(result, Err(ConnectionError::Exhausted { attempts: 1, .. })));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let connector = FlakyConnector::new(0);
        let result = connect_with_retry(&connector, RetrySchedule::new(0, 30), &CancellationToken::new()).await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_retry_wait() {
        let connector = FlakyConnector::new(u32::MAX);
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(45)).await;
            trigger.cancel();
        });

        let result = connect_with_retry(&connector, RetrySchedule::new(10, 30), &shutdown).await;

        assert!(matches!(result, Err(ConnectionError::Cancelled { attempts: 2 })));
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_error_drain_stops_when_senders_close() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let drain = spawn_error_drain(rx, CancellationToken::new());

        tx.send("connection reset".to_string()).unwrap();
        tx.send("heartbeat missed".to_string()).unwrap();
        drop(tx);

        drain.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_drain_stops_on_cancel() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let lifetime = CancellationToken::new();
        let drain = spawn_error_drain(rx, lifetime.clone());

        lifetime.cancel();
        drain.await.unwrap();
        drop(tx);
    }
}
