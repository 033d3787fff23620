//! Throttled request dispatch
//!
//! Every request to the alert API goes through a [`Dispatcher`]. Dispatchers
//! that share a [`Throttle`] share one lane: requests are serialized and the
//! start of any two consecutive dispatches is separated by at least the
//! throttle's minimum interval.
//!
//! ## Timing
//!
//! ```text
//!  caller A ──lock──[send A..........]──unlock
//!  caller B ──────────────────────────lock──[wait deficit]──[send B]──unlock
//!           ^ start A                       ^ start B >= start A + interval
//! ```
//!
//! The lock is held across both the wait and the transport call. The
//! timestamp is taken immediately before the call, so a slow response does
//! not push the next dispatch further out than the interval requires.
//!
//! ## Cancellation
//!
//! [`Dispatcher::dispatch_with_cancel`] honors a [`CancellationToken`] while
//! queued for the lock, during the throttle wait, and during the call. A
//! request abandoned before its timestamp is recorded consumes no slot.

use crate::error::{Error, Result};
use crate::traits::{ApiRequest, ApiResponse, Transport};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default minimum interval between requests, in seconds
pub const DEFAULT_INTERVAL_SECS: i64 = 2;

/// Shared rate-limit state
///
/// Cloning a `Throttle` yields another handle to the same state. Hand the
/// same throttle to every dispatcher that draws on one API quota.
#[derive(Clone)]
pub struct Throttle {
    inner: Arc<ThrottleInner>,
}

struct ThrottleInner {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle with the given minimum interval in seconds
    ///
    /// Values of zero or below are floored to one second.
    pub fn new(interval_secs: i64) -> Self {
        let secs = interval_secs.max(1) as u64;
        Self {
            inner: Arc::new(ThrottleInner {
                min_interval: Duration::from_secs(secs),
                last_dispatch: Mutex::new(None),
            }),
        }
    }

    /// Minimum gap between the start of two dispatches
    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// When the most recent dispatch started, if any
    pub async fn last_dispatch(&self) -> Option<Instant> {
        *self.inner.last_dispatch.lock().await
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_SECS)
    }
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("min_interval", &self.inner.min_interval)
            .finish()
    }
}

/// Serializes requests onto a transport under a [`Throttle`]
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    throttle: Throttle,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, throttle: Throttle) -> Self {
        Self {
            transport,
            throttle,
        }
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Dispatch a request, waiting out the throttle interval if needed
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatch_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Dispatch a request, giving up as soon as `cancel` fires
    ///
    /// # Returns
    ///
    /// - `Ok(ApiResponse)`: The transport completed the exchange
    /// - `Err(Error::Cancelled)`: The token fired first
    /// - `Err(Error::Transport)`: Propagated unchanged from the transport
    pub async fn dispatch_with_cancel(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        let label = format!("{} {}", request.method, request.path);
        let inner = &self.throttle.inner;

        let mut last_dispatch = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::cancelled(format!("{} abandoned while queued", label)));
            }
            guard = inner.last_dispatch.lock() => guard,
        };

        if let Some(previous) = *last_dispatch {
            let elapsed = previous.elapsed();
            if elapsed < inner.min_interval {
                let deficit = inner.min_interval - elapsed;
                debug!(
                    request = %label,
                    wait_ms = deficit.as_millis() as u64,
                    "Throttling request"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(Error::cancelled(format!("{} abandoned during throttle wait", label)));
                    }
                    _ = tokio::time::sleep(deficit) => {}
                }
            }
        }

        *last_dispatch = Some(Instant::now());
        debug!(
            request = %label,
            transport = self.transport.transport_name(),
            "Dispatching request"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(Error::cancelled(format!("{} abandoned in flight", label)))
            }
            response = self.transport.send(request) => response,
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("transport", &self.transport.transport_name())
            .field("throttle", &self.throttle)
            .finish()
    }
}
