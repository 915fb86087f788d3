//! Bounded worker pool with first-error cancellation.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Phase, ReconcileError, ReconcileResult};

/// Run `task` for every item with at most `concurrency` in flight.
///
/// Once a task fails no further tasks are launched; tasks already in flight
/// run to completion. `on_success` is called from the dispatcher for every
/// task that succeeds. Returns the number of successful tasks, or the first
/// error observed.
pub(crate) async fn run_bounded<T, F, Fut>(
    phase: Phase,
    items: Vec<T>,
    concurrency: usize,
    on_success: impl Fn(),
    task: F,
) -> ReconcileResult<usize>
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ReconcileResult<()>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    let mut outcome = Outcome::new(phase, cancel.clone());

    for item in items {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        while let Some(joined) = tasks.try_join_next() {
            outcome.settle(joined, &on_success);
        }
        if cancel.is_cancelled() {
            break;
        }

        let token = cancel.clone();
        let future = task(item);
        tasks.spawn(async move {
            let _permit = permit;
            // Dropped before the permit, so a panicking task cancels too.
            let guard = token.drop_guard();
            let result = future.await;
            if result.is_ok() {
                guard.disarm();
            }
            result
        });
    }

    while let Some(joined) = tasks.join_next().await {
        outcome.settle(joined, &on_success);
    }

    outcome.finish()
}

struct Outcome {
    phase: Phase,
    cancel: CancellationToken,
    succeeded: usize,
    first_error: Option<ReconcileError>,
}

impl Outcome {
    fn new(phase: Phase, cancel: CancellationToken) -> Self {
        Self {
            phase,
            cancel,
            succeeded: 0,
            first_error: None,
        }
    }

    fn settle(
        &mut self,
        joined: Result<ReconcileResult<()>, JoinError>,
        on_success: &impl Fn(),
    ) {
        let error = match joined {
            Ok(Ok(())) => {
                self.succeeded += 1;
                on_success();
                return;
            }
            Ok(Err(error)) => error,
            Err(join_error) => ReconcileError::Task {
                phase: self.phase,
                message: join_error.to_string(),
            },
        };
        self.cancel.cancel();

        if self.first_error.is_none() {
            self.first_error = Some(error);
        } else {
            debug!(phase = %self.phase, error = %error, "Additional failure after cancellation");
        }
    }

    fn finish(self) -> ReconcileResult<usize> {
        match self.first_error {
            Some(error) => Err(error),
            None => Ok(self.succeeded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_all_items() {
        let progress = AtomicUsize::new(0);
        let done = run_bounded(
            Phase::Create,
            (0..25).collect(),
            4,
            || {
                progress.fetch_add(1, Ordering::SeqCst);
            },
            |_: usize| async { Ok(()) },
        )
        .await
        .unwrap();

        assert_eq!(done, 25);
        assert_eq!(progress.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn test_respects_concurrency_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        run_bounded(Phase::Delete, (0..30).collect(), 3, || {}, |_: usize| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_first_error_stops_new_work() {
        let started = Arc::new(AtomicUsize::new(0));

        let result = run_bounded(Phase::Create, (0..100).collect(), 1, || {}, |item: usize| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if item == 2 {
                    Err(ReconcileError::Create {
                        external_id: format!("item-{item}"),
                        source: "boom".into(),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.external_id(), Some("item-2"));
        assert_eq!(started.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_panic_becomes_task_error() {
        let result = run_bounded(Phase::Delete, vec![1usize], 2, || {}, |_: usize| async {
            panic!("worker exploded");
        })
        .await;

        assert!(matches!(
            result,
            Err(ReconcileError::Task {
                phase: Phase::Delete,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_panic_stops_new_work() {
        let started = Arc::new(AtomicUsize::new(0));

        let result = run_bounded(Phase::Create, (0..50).collect(), 1, || {}, |item: usize| {
            let started = Arc::clone(&started);
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                if item == 0 {
                    panic!("worker exploded");
                }
                Ok(())
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(ReconcileError::Task {
                phase: Phase::Create,
                ..
            })
        ));
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
