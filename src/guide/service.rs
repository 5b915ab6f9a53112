//! Single-flight guide refresh
//!
//! Concurrent refresh requests share one build. The latest requested target
//! and limit are recorded, a single background task builds until the
//! published guide satisfies them, and every caller waits on a watch channel
//! for a guide covering its own request. Failed builds are retried forever
//! with exponential backoff while the previous guide stays available.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::builder::{Guide, GuideSource, GuideWindow};
use super::error::{GuideError, GuideResult};
use crate::models::Millis;
use crate::utils::retry::{Backoff, RetryConfig};

/// Snapshot of the refresh state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    /// Whether a build task is running
    pub building: bool,

    /// Consecutive failed builds
    pub failures: u32,

    /// Delay before the retry following the next failure
    pub next_retry_delay: Duration,

    /// Successful builds since the service started
    pub builds: u64,

    /// Window of the published guide
    pub cached_window: Option<GuideWindow>,
}

struct RefreshState {
    source: Option<Arc<dyn GuideSource>>,
    target: Millis,
    limit: Millis,
    building: bool,
    backoff: Backoff,
    builds: u64,
}

struct ServiceInner {
    state: Mutex<RefreshState>,
    guide: watch::Sender<Option<Arc<Guide>>>,
}

/// Guide cache with coalesced, retried refreshes
#[derive(Clone)]
pub struct GuideService {
    inner: Arc<ServiceInner>,
}

impl Default for GuideService {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl GuideService {
    pub fn new(retry: RetryConfig) -> Self {
        let (guide, _) = watch::channel(None);
        Self {
            inner: Arc::new(ServiceInner {
                state: Mutex::new(RefreshState {
                    source: None,
                    target: Millis::MIN,
                    limit: Millis::MIN,
                    building: false,
                    backoff: Backoff::new(retry),
                    builds: 0,
                }),
                guide,
            }),
        }
    }

    /// Last published guide, possibly stale
    pub fn current(&self) -> Option<Arc<Guide>> {
        self.inner.guide.borrow().clone()
    }

    /// Receive every guide published from now on
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Guide>>> {
        self.inner.guide.subscribe()
    }

    pub async fn status(&self) -> RefreshStatus {
        let state = self.inner.state.lock().await;
        RefreshStatus {
            building: state.building,
            failures: state.backoff.failures(),
            next_retry_delay: state.backoff.peek(),
            builds: state.builds,
            cached_window: self.current().map(|g| GuideWindow {
                start: g.target,
                end: g.until,
            }),
        }
    }

    /// Get a guide covering `[target, target + window)`
    ///
    /// Returns the published guide when it already covers the request.
    /// Otherwise the request is recorded, a build is started unless one is in
    /// flight, and the call waits until a satisfying guide is published.
    pub async fn request_refresh(
        &self,
        source: Arc<dyn GuideSource>,
        target: Millis,
        window: Millis,
    ) -> GuideResult<Arc<Guide>> {
        if window <= 0 {
            return Err(GuideError::EmptyWindow {
                start: target,
                end: target.saturating_add(window),
            });
        }
        let limit = target.saturating_add(window);

        if let Some(guide) = self.current().filter(|g| g.satisfies(target, limit)) {
            return Ok(guide);
        }

        let mut rx = self.inner.guide.subscribe();
        {
            let mut state = self.inner.state.lock().await;
            state.source = Some(source);
            state.target = state.target.max(target);
            state.limit = state.limit.max(limit);

            if state.building {
                debug!(target, limit, "Joining guide build in flight");
            } else {
                state.building = true;
                tokio::spawn(drive(Arc::clone(&self.inner)));
            }
        }

        let guide = rx
            .wait_for(|guide| guide.as_ref().is_some_and(|g| g.satisfies(target, limit)))
            .await
            .map_err(|_| GuideError::ServiceClosed)?;

        guide.clone().ok_or(GuideError::ServiceClosed)
    }
}

/// Build until the published guide covers the latest request
async fn drive(inner: Arc<ServiceInner>) {
    loop {
        let (source, window) = {
            let mut state = inner.state.lock().await;
            match state.source.clone() {
                Some(source) => (
                    source,
                    GuideWindow {
                        start: state.target,
                        end: state.limit,
                    },
                ),
                None => {
                    state.building = false;
                    return;
                }
            }
        };

        debug!(start = window.start, end = window.end, "Building guide");
        let result = tokio::task::spawn_blocking(move || source.build(window))
            .await
            .map_err(|e| GuideError::BuildAborted(e.to_string()))
            .and_then(|built| built);

        let mut state = inner.state.lock().await;
        match result {
            Ok(guide) => {
                if state.backoff.failures() > 0 {
                    info!(
                        failures = state.backoff.failures(),
                        "Guide build recovered"
                    );
                }
                state.backoff.reset();
                state.builds += 1;

                let done = guide.satisfies(state.target, state.limit);
                inner.guide.send_replace(Some(Arc::new(guide)));
                if done {
                    state.building = false;
                    return;
                }
                debug!(
                    target = state.target,
                    limit = state.limit,
                    "Newer request arrived during build, rebuilding"
                );
            }
            Err(e) => {
                let delay = state.backoff.next_delay();
                warn!(
                    error = %e,
                    failures = state.backoff.failures(),
                    delay_ms = delay.as_millis() as u64,
                    "Guide build failed, retrying"
                );
                drop(state);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
