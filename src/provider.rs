use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use log::{debug, warn};

use crate::cache::LocationMode;
use crate::coords::Coordinates;
use crate::error::{GeolocationError, GeolocationErrorKind};

/// Permission states reported by the device permission query.
/// `Unavailable` covers platforms without the capability or without a
/// permission API at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
    Unavailable,
}

/// Raw failure shape of the device location API: `code` is 1 (permission
/// denied), 2 (position unavailable) or 3 (timeout).
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformError {
    pub code: i32,
    pub message: String,
}

/// Options forwarded to the platform for one request or watch.
#[derive(Debug, Clone, Copy)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

/// Opaque id of a continuous platform watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// The device location capability. Implemented by platform adapters in the
/// embedding application; replies and updates are delivered by sending into
/// the channel handed over with the call. A send into a channel whose
/// receiver is gone (e.g. the request already timed out) fails silently and
/// must be ignored by the adapter.
pub trait GeoBackend: Send + Sync {
    /// Whether the capability exists at all on this platform.
    fn supported(&self) -> bool;

    /// Side-effect-free permission query.
    fn permission_state(&self) -> PermissionState;

    /// Issue one position request; exactly one reply is expected on `reply`.
    fn request_position(
        &self,
        request: PositionRequest,
        reply: Sender<Result<Coordinates, PlatformError>>,
    );

    /// Open a continuous watch delivering zero or more results on `updates`
    /// until [`GeoBackend::clear_watch`] is called with the returned id.
    fn start_watch(
        &self,
        request: PositionRequest,
        updates: Sender<Result<Coordinates, PlatformError>>,
    ) -> WatchId;

    /// Release the platform watch. Called at most once per id.
    fn clear_watch(&self, id: WatchId);
}

/// Thin wrapper over the device capability: single-shot acquisition with a
/// cooperative timeout, continuous watch subscriptions, permission query.
///
/// No retry policy lives here. A caller that wants "high accuracy, then fall
/// back to low accuracy" issues two separate [`LocationProvider::acquire`]
/// calls with different modes.
#[derive(Clone)]
pub struct LocationProvider {
    backend: Arc<dyn GeoBackend>,
}

impl LocationProvider {
    pub fn new(backend: Arc<dyn GeoBackend>) -> Self {
        Self { backend }
    }

    /// Side-effect-free permission query; `Unavailable` when the platform
    /// has no geolocation capability.
    pub fn check_permission(&self) -> PermissionState {
        if !self.backend.supported() {
            return PermissionState::Unavailable;
        }
        self.backend.permission_state()
    }

    /// One hardware request configured by `mode`. Blocks the calling thread
    /// until the platform replies or `mode.timeout` elapses, whichever comes
    /// first. On timeout the reply channel is dropped, so a late platform
    /// callback lands nowhere and is ignored; actual cancellation of the
    /// in-flight hardware request is best-effort on the platform side.
    pub fn acquire(&self, mode: &LocationMode) -> Result<Coordinates, GeolocationError> {
        if !self.backend.supported() {
            return Err(GeolocationError::new(
                GeolocationErrorKind::Unsupported,
                "geolocation capability not present",
            ));
        }

        let (reply_tx, reply_rx) = bounded(1);
        self.backend.request_position(
            PositionRequest { high_accuracy: mode.high_accuracy, timeout: mode.timeout },
            reply_tx,
        );

        match reply_rx.recv_timeout(mode.timeout) {
            Ok(Ok(fix)) => {
                debug!("acquired fix {} (accuracy {:?} m)", fix.format(), fix.accuracy);
                Ok(fix)
            }
            Ok(Err(platform)) => {
                warn!("position request failed: code {} ({})", platform.code, platform.message);
                Err(GeolocationError::from_platform(&platform))
            }
            Err(RecvTimeoutError::Timeout) => Err(GeolocationError::new(
                GeolocationErrorKind::Timeout,
                format!("no fix within {} ms", mode.timeout.as_millis()),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(GeolocationError::new(
                GeolocationErrorKind::Unknown,
                "platform dropped the position request",
            )),
        }
    }

    /// Open a continuous subscription. Each call owns its own platform
    /// watch; dropping or cancelling the subscription releases it.
    pub fn watch(&self, mode: &LocationMode) -> Result<WatchSubscription, GeolocationError> {
        if !self.backend.supported() {
            return Err(GeolocationError::new(
                GeolocationErrorKind::Unsupported,
                "geolocation capability not present",
            ));
        }

        let (tx, rx) = unbounded();
        let id = self.backend.start_watch(
            PositionRequest { high_accuracy: mode.high_accuracy, timeout: mode.timeout },
            tx,
        );
        debug!("watch {:?} started", id);

        Ok(WatchSubscription {
            id,
            updates: rx,
            backend: Arc::clone(&self.backend),
            cancelled: AtomicBool::new(false),
        })
    }
}

/// A live continuous-watch subscription.
///
/// Updates are pulled with [`try_next`](Self::try_next) /
/// [`next_timeout`](Self::next_timeout). [`cancel`](Self::cancel) is
/// synchronous and idempotent; the platform watch is released exactly once
/// no matter how often it is called, and `Drop` routes through it.
pub struct WatchSubscription {
    id: WatchId,
    updates: Receiver<Result<Coordinates, PlatformError>>,
    backend: Arc<dyn GeoBackend>,
    cancelled: AtomicBool,
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("id", &self.id)
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

impl WatchSubscription {
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Next pending update, if one is already queued.
    pub fn try_next(&self) -> Option<Result<Coordinates, GeolocationError>> {
        self.updates.try_recv().ok().map(Self::convert)
    }

    /// Wait up to `wait` for the next update. `None` on expiry or after the
    /// producer side is gone.
    pub fn next_timeout(&self, wait: Duration) -> Option<Result<Coordinates, GeolocationError>> {
        self.updates.recv_timeout(wait).ok().map(Self::convert)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop the subscription. Safe to call any number of times; only the
    /// first call reaches the platform.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("watch {:?} cancelled", self.id);
            self.backend.clear_watch(self.id);
        }
    }

    fn convert(update: Result<Coordinates, PlatformError>) -> Result<Coordinates, GeolocationError> {
        update.map_err(|e| GeolocationError::from_platform(&e))
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
