//! Query context: deadline and cancellation threaded through a search
//!
//! Provides:
//! - An optional deadline relative to when the context was created
//! - An optional cancellation signal fired through a [`CancelHandle`]
//! - [`QueryContext::done`], a future that resolves when either fires
//!
//! Contexts are cheap to clone; clones observe the same signal.

use crate::errors::AppError;
use std::future::pending;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline and cancellation state for one query
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    deadline: Option<Deadline>,
    cancel: Option<watch::Receiver<bool>>,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

/// Fires cancellation for every context cloned from the one it was created with
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl QueryContext {
    /// A context that never expires and cannot be cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// Add a deadline `timeout` from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Deadline {
            at: Instant::now() + timeout,
            timeout,
        });
        self
    }

    /// Attach a cancellation signal, returning the handle that fires it
    pub fn with_cancellation(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx })
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.at.saturating_duration_since(Instant::now()))
    }

    /// Non-blocking check of both termination conditions
    pub fn check(&self) -> Result<(), AppError> {
        if let Some(rx) = &self.cancel {
            if *rx.borrow() {
                return Err(AppError::Cancelled);
            }
        }
        if let Some(d) = self.deadline {
            if Instant::now() >= d.at {
                return Err(d.exceeded());
            }
        }
        Ok(())
    }

    /// Resolve once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a background context.
    pub async fn done(&self) -> AppError {
        let deadline = async {
            match self.deadline {
                Some(d) => {
                    tokio::time::sleep_until(d.at).await;
                    d.exceeded()
                }
                None => pending().await,
            }
        };

        let cancelled = async {
            match self.cancel.clone() {
                // A dropped handle can no longer cancel
                Some(mut rx) => {
                    let fired = rx.wait_for(|c| *c).await.is_ok();
                    if fired {
                        AppError::Cancelled
                    } else {
                        pending().await
                    }
                }
                None => pending().await,
            }
        };

        tokio::select! {
            err = deadline => err,
            err = cancelled => err,
        }
    }
}

impl Deadline {
    fn exceeded(&self) -> AppError {
        AppError::DeadlineExceeded {
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[tokio::test]
    async fn test_background_never_done() {
        let ctx = QueryContext::background();
        assert!(ctx.check().is_ok());
        let res = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(res.is_err(), "background context must not resolve");
    }

    #[tokio::test]
    async fn test_cancel_resolves_clones() {
        let (ctx, handle) = QueryContext::background().with_cancellation();
        let clone = ctx.clone();

        let waiter = tokio::spawn(async move { clone.done().await });
        handle.cancel();

        let err = waiter.await.unwrap();
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert!(handle.is_cancelled());
        assert!(matches!(ctx.check(), Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_fires() {
        let ctx = QueryContext::background().with_timeout(Duration::from_millis(30));
        assert!(ctx.check().is_ok());

        let err = ctx.done().await;
        assert!(matches!(err, AppError::DeadlineExceeded { timeout_ms: 30 }));
        assert!(ctx.check().is_err());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_dropped_handle_never_cancels() {
        let (ctx, handle) = QueryContext::background().with_cancellation();
        drop(handle);
        let res = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(res.is_err());
    }
}
