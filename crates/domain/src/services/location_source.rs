//! Location provider seam and a channel-backed implementation fed by callers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{LocationFix, LocationUpdateConfig};
use shared::geodesy::distance_meters;

/// Capacity of the per-subscription fix buffer.
const FEED_CAPACITY: usize = 64;

/// Errors a location provider can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Terminal: tracking cannot continue until permission is granted again.
    #[error("location permission denied")]
    PermissionDenied,

    /// Transient: the provider may recover on its own.
    #[error("location provider unavailable: {0}")]
    ProviderUnavailable(String),
}

pub type LocationItem = Result<LocationFix, LocationError>;

/// Source of live location fixes.
pub trait LocationSource: Send + Sync {
    /// Opens a fix stream honoring `config`. Fails with
    /// [`LocationError::PermissionDenied`] when location access is not granted.
    fn request_updates(
        &self,
        config: LocationUpdateConfig,
    ) -> Result<LocationSubscription, LocationError>;
}

/// An open fix stream. Dropping it releases the provider.
#[derive(Debug)]
pub struct LocationSubscription {
    rx: mpsc::Receiver<LocationItem>,
    cancel: CancellationToken,
    revoked: Arc<AtomicBool>,
}

impl LocationSubscription {
    fn new(
        rx: mpsc::Receiver<LocationItem>,
        cancel: CancellationToken,
        revoked: Arc<AtomicBool>,
    ) -> Self {
        Self {
            rx,
            cancel,
            revoked,
        }
    }

    /// Next fix or provider error. `None` once the stream is closed or cancelled.
    ///
    /// A permission revocation is reported exactly once, ahead of any fixes
    /// still buffered.
    pub async fn recv(&mut self) -> Option<LocationItem> {
        if !self.cancel.is_cancelled() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {}
                item = self.rx.recv() => return item,
            }
        }
        self.revoked
            .swap(false, Ordering::SeqCst)
            .then_some(Err(LocationError::PermissionDenied))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LocationSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Result of offering a fix to the active subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// Dropped by the subscription's interval or distance filter.
    Throttled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("location tracking is not active")]
    NotTracking,

    #[error("location feed is backed up")]
    Backpressure,
}

#[derive(Debug)]
struct ActiveFeed {
    tx: mpsc::Sender<LocationItem>,
    cancel: CancellationToken,
    revoked: Arc<AtomicBool>,
    config: LocationUpdateConfig,
    last_delivered: Option<LocationFix>,
}

impl ActiveFeed {
    fn is_open(&self) -> bool {
        !self.cancel.is_cancelled() && !self.tx.is_closed()
    }

    fn should_throttle(&self, fix: &LocationFix) -> bool {
        let Some(last) = self.last_delivered else {
            return false;
        };
        let elapsed_ms = fix.timestamp.saturating_sub(last.timestamp);
        if elapsed_ms < self.config.min_interval_ms as i64 {
            return true;
        }
        distance_meters(last.position(), fix.position()) < self.config.min_distance_meters
    }
}

#[derive(Debug)]
struct FeedState {
    permission_granted: bool,
    active: Option<ActiveFeed>,
}

#[derive(Debug)]
struct FeedInner {
    state: Mutex<FeedState>,
    opened: AtomicUsize,
}

/// Location source fed from outside, e.g. by fixes uploaded over HTTP.
///
/// At most one subscription is live at a time; requesting a new one cancels
/// the previous one.
#[derive(Debug, Clone)]
pub struct ChannelLocationSource {
    inner: Arc<FeedInner>,
}

impl Default for ChannelLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelLocationSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FeedInner {
                state: Mutex::new(FeedState {
                    permission_granted: true,
                    active: None,
                }),
                opened: AtomicUsize::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        // A panic while holding the lock cannot leave FeedState half-updated.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_feed(state: &mut FeedState) -> Option<&mut ActiveFeed> {
        if state.active.as_ref().is_some_and(|feed| !feed.is_open()) {
            state.active = None;
        }
        state.active.as_mut()
    }

    /// Offers a fix to the active subscription.
    pub fn push_fix(&self, fix: LocationFix) -> Result<PushOutcome, FeedError> {
        let mut state = self.state();
        let feed = Self::open_feed(&mut state).ok_or(FeedError::NotTracking)?;

        if feed.should_throttle(&fix) {
            return Ok(PushOutcome::Throttled);
        }

        match feed.tx.try_send(Ok(fix)) {
            Ok(()) => {
                feed.last_delivered = Some(fix);
                Ok(PushOutcome::Delivered)
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(FeedError::Backpressure),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                state.active = None;
                Err(FeedError::NotTracking)
            }
        }
    }

    /// Reports a transient provider outage to the active subscription.
    pub fn report_unavailable(&self, reason: impl Into<String>) -> Result<(), FeedError> {
        let mut state = self.state();
        let feed = Self::open_feed(&mut state).ok_or(FeedError::NotTracking)?;
        feed.tx
            .try_send(Err(LocationError::ProviderUnavailable(reason.into())))
            .map_err(|_| FeedError::Backpressure)
    }

    /// Revokes location permission. The active subscription receives a
    /// terminal error, even with a full buffer, and later requests fail until
    /// permission is granted.
    pub fn revoke_permission(&self) {
        let mut state = self.state();
        state.permission_granted = false;
        if let Some(feed) = state.active.take() {
            feed.revoked.store(true, Ordering::SeqCst);
            feed.cancel.cancel();
        }
    }

    pub fn grant_permission(&self) {
        self.state().permission_granted = true;
    }

    pub fn permission_granted(&self) -> bool {
        self.state().permission_granted
    }

    /// Number of live subscriptions, either 0 or 1.
    pub fn active_subscriptions(&self) -> usize {
        let mut state = self.state();
        usize::from(Self::open_feed(&mut state).is_some())
    }

    /// Total subscriptions ever opened.
    pub fn subscriptions_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Config of the live subscription, if any.
    pub fn current_config(&self) -> Option<LocationUpdateConfig> {
        let mut state = self.state();
        Self::open_feed(&mut state).map(|feed| feed.config)
    }
}

impl LocationSource for ChannelLocationSource {
    fn request_updates(
        &self,
        config: LocationUpdateConfig,
    ) -> Result<LocationSubscription, LocationError> {
        let mut state = self.state();
        if !state.permission_granted {
            return Err(LocationError::PermissionDenied);
        }

        if let Some(previous) = state.active.take() {
            previous.cancel.cancel();
        }

        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let cancel = CancellationToken::new();
        let revoked = Arc::new(AtomicBool::new(false));
        state.active = Some(ActiveFeed {
            tx,
            cancel: cancel.clone(),
            revoked: revoked.clone(),
            config,
            last_delivered: None,
        });
        self.inner.opened.fetch_add(1, Ordering::SeqCst);

        Ok(LocationSubscription::new(rx, cancel, revoked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unthrottled() -> LocationUpdateConfig {
        LocationUpdateConfig {
            high_accuracy: true,
            min_interval_ms: 0,
            min_distance_meters: 0.0,
        }
    }

    #[tokio::test]
    async fn test_push_without_subscription() {
        let source = ChannelLocationSource::new();
        assert_eq!(
            source.push_fix(LocationFix::new(0.0, 0.0, 1)),
            Err(FeedError::NotTracking)
        );
    }

    #[tokio::test]
    async fn test_fixes_flow_to_subscription() {
        let source = ChannelLocationSource::new();
        let mut sub = source.request_updates(unthrottled()).unwrap();

        let fix = LocationFix::new(10.0, 20.0, 1_000);
        assert_eq!(source.push_fix(fix), Ok(PushOutcome::Delivered));
        assert_eq!(sub.recv().await, Some(Ok(fix)));
    }

    #[tokio::test]
    async fn test_throttling_by_interval_and_distance() {
        let source = ChannelLocationSource::new();
        let _sub = source
            .request_updates(LocationUpdateConfig::default())
            .unwrap();

        let first = LocationFix::new(0.0, 0.0, 10_000);
        assert_eq!(source.push_fix(first), Ok(PushOutcome::Delivered));
        // too soon
        assert_eq!(
            source.push_fix(LocationFix::new(0.01, 0.0, 10_500)),
            Ok(PushOutcome::Throttled)
        );
        // too close
        assert_eq!(
            source.push_fix(LocationFix::new(0.0, 0.0, 20_000)),
            Ok(PushOutcome::Throttled)
        );
        assert_eq!(
            source.push_fix(LocationFix::new(0.01, 0.0, 20_000)),
            Ok(PushOutcome::Delivered)
        );
    }

    #[tokio::test]
    async fn test_dropping_subscription_releases_provider() {
        let source = ChannelLocationSource::new();
        let sub = source.request_updates(unthrottled()).unwrap();
        assert_eq!(source.active_subscriptions(), 1);

        drop(sub);
        assert_eq!(source.active_subscriptions(), 0);
        assert_eq!(
            source.push_fix(LocationFix::new(0.0, 0.0, 1)),
            Err(FeedError::NotTracking)
        );
    }

    #[tokio::test]
    async fn test_new_request_replaces_previous() {
        let source = ChannelLocationSource::new();
        let mut first = source.request_updates(unthrottled()).unwrap();
        let _second = source.request_updates(unthrottled()).unwrap();

        assert!(first.is_cancelled());
        assert_eq!(first.recv().await, None);
        assert_eq!(source.active_subscriptions(), 1);
        assert_eq!(source.subscriptions_opened(), 2);
    }

    #[tokio::test]
    async fn test_permission_revocation() {
        let source = ChannelLocationSource::new();
        let mut sub = source.request_updates(unthrottled()).unwrap();

        source.revoke_permission();
        assert_eq!(sub.recv().await, Some(Err(LocationError::PermissionDenied)));
        assert!(matches!(
            source.request_updates(unthrottled()),
            Err(LocationError::PermissionDenied)
        ));

        source.grant_permission();
        assert!(source.request_updates(unthrottled()).is_ok());
    }

    #[tokio::test]
    async fn test_revocation_reaches_subscriber_with_full_buffer() {
        let source = ChannelLocationSource::new();
        let mut sub = source.request_updates(unthrottled()).unwrap();

        for i in 0..FEED_CAPACITY {
            source
                .push_fix(LocationFix::new(0.0, 0.0, i as i64 + 1))
                .unwrap();
        }
        assert_eq!(
            source.push_fix(LocationFix::new(0.0, 0.0, 1_000)),
            Err(FeedError::Backpressure)
        );

        source.revoke_permission();
        assert_eq!(sub.recv().await, Some(Err(LocationError::PermissionDenied)));
        assert_eq!(sub.recv().await, None);
        assert_eq!(source.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_provider_unavailable_is_transient() {
        let source = ChannelLocationSource::new();
        let mut sub = source.request_updates(unthrottled()).unwrap();

        source.report_unavailable("gps off").unwrap();
        assert!(matches!(
            sub.recv().await,
            Some(Err(LocationError::ProviderUnavailable(reason))) if reason == "gps off"
        ));

        source.push_fix(LocationFix::new(0.0, 0.0, 5)).unwrap();
        assert!(sub.recv().await.unwrap().is_ok());
    }
}
