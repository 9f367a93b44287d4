//! Scriptable fakes for the two external capability seams, shared by the
//! unit tests across modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::coords::Coordinates;
use crate::provider::{GeoBackend, PermissionState, PlatformError, PositionRequest, WatchId};
use crate::viewport::{
    DragEvent, GeoBounds, MapBackend, MarkerOptions, MarkerRef, PolylineRef, PolylineStyle,
    SurfaceRef,
};

/// Device capability fake: answers position requests with a configurable
/// fix or failure, optionally after a delay on a background thread, and
/// keeps call counters for coalescing/teardown assertions.
pub struct ScriptedGeoBackend {
    supported: bool,
    permission: Mutex<PermissionState>,
    fix: Mutex<Coordinates>,
    failure: Mutex<Option<PlatformError>>,
    reply_delay: Mutex<Option<Duration>>,
    position_requests: AtomicUsize,
    watches_started: AtomicUsize,
    watches_cleared: AtomicUsize,
    next_watch_id: AtomicU64,
    watch_sinks: Mutex<Vec<(WatchId, Sender<Result<Coordinates, PlatformError>>)>>,
}

impl ScriptedGeoBackend {
    pub fn new() -> Self {
        Self {
            supported: true,
            permission: Mutex::new(PermissionState::Granted),
            fix: Mutex::new(Coordinates::new(-2.1709979, -79.9223592)),
            failure: Mutex::new(None),
            reply_delay: Mutex::new(None),
            position_requests: AtomicUsize::new(0),
            watches_started: AtomicUsize::new(0),
            watches_cleared: AtomicUsize::new(0),
            next_watch_id: AtomicU64::new(1),
            watch_sinks: Mutex::new(Vec::new()),
        }
    }

    /// A platform without the capability at all.
    pub fn unsupported() -> Self {
        Self { supported: false, ..Self::new() }
    }

    pub fn set_permission(&self, state: PermissionState) {
        *self.permission.lock().unwrap() = state;
    }

    pub fn set_fix(&self, fix: Coordinates) {
        *self.fix.lock().unwrap() = fix;
    }

    /// Make every subsequent request fail with the given platform error.
    pub fn fail_with(&self, code: i32, message: &str) {
        *self.failure.lock().unwrap() = Some(PlatformError { code, message: message.to_string() });
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Deliver replies on a background thread after `delay`.
    pub fn set_reply_delay(&self, delay: Duration) {
        *self.reply_delay.lock().unwrap() = Some(delay);
    }

    pub fn position_requests(&self) -> usize {
        self.position_requests.load(Ordering::SeqCst)
    }

    pub fn watches_started(&self) -> usize {
        self.watches_started.load(Ordering::SeqCst)
    }

    pub fn watches_cleared(&self) -> usize {
        self.watches_cleared.load(Ordering::SeqCst)
    }

    /// Push a fix to every live watch.
    pub fn emit_watch_update(&self, fix: Coordinates) {
        for (_, sink) in self.watch_sinks.lock().unwrap().iter() {
            let _ = sink.send(Ok(fix));
        }
    }

    /// Push a platform error to every live watch.
    pub fn emit_watch_error(&self, code: i32, message: &str) {
        for (_, sink) in self.watch_sinks.lock().unwrap().iter() {
            let _ = sink.send(Err(PlatformError { code, message: message.to_string() }));
        }
    }

    fn scripted_reply(&self) -> Result<Coordinates, PlatformError> {
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(*self.fix.lock().unwrap()),
        }
    }
}

impl GeoBackend for ScriptedGeoBackend {
    fn supported(&self) -> bool {
        self.supported
    }

    fn permission_state(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    fn request_position(
        &self,
        _request: PositionRequest,
        reply: Sender<Result<Coordinates, PlatformError>>,
    ) {
        self.position_requests.fetch_add(1, Ordering::SeqCst);
        let item = self.scripted_reply();
        match *self.reply_delay.lock().unwrap() {
            Some(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    // Receiver may be gone if the caller timed out; ignored.
                    let _ = reply.send(item);
                });
            }
            None => {
                let _ = reply.send(item);
            }
        }
    }

    fn start_watch(
        &self,
        _request: PositionRequest,
        updates: Sender<Result<Coordinates, PlatformError>>,
    ) -> WatchId {
        self.watches_started.fetch_add(1, Ordering::SeqCst);
        let id = WatchId(self.next_watch_id.fetch_add(1, Ordering::SeqCst));
        self.watch_sinks.lock().unwrap().push((id, updates));
        id
    }

    fn clear_watch(&self, id: WatchId) {
        self.watches_cleared.fetch_add(1, Ordering::SeqCst);
        self.watch_sinks.lock().unwrap().retain(|(watch, _)| *watch != id);
    }
}

/// Operation counters recorded by [`RecordingMapBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapBackendStats {
    pub surfaces_created: usize,
    pub surfaces_released: usize,
    pub markers_placed: usize,
    pub markers_moved: usize,
    pub markers_dropped: usize,
    pub polylines_drawn: usize,
    pub polylines_dropped: usize,
    pub set_view_calls: usize,
    pub fit_calls: usize,
}

#[derive(Default)]
struct ProbeState {
    stats: MapBackendStats,
    last_marker_ref: u64,
    drag_sink: Option<Sender<DragEvent>>,
}

/// Test-side handle to a [`RecordingMapBackend`] after the backend itself
/// has been boxed into a viewport.
#[derive(Clone)]
pub struct MapBackendProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl MapBackendProbe {
    pub fn stats(&self) -> MapBackendStats {
        self.state.lock().unwrap().stats
    }

    /// Ref of the most recently placed marker.
    pub fn last_marker_ref(&self) -> u64 {
        self.state.lock().unwrap().last_marker_ref
    }

    /// Simulate the user dragging a marker on the widget.
    pub fn emit_drag(&self, surface: SurfaceRef, marker: MarkerRef, to: Coordinates) {
        let state = self.state.lock().unwrap();
        if let Some(sink) = &state.drag_sink {
            let _ = sink.send(DragEvent { surface, marker, coordinates: to });
        }
    }
}

/// Rendering capability fake: mints refs from a counter and records every
/// operation.
pub struct RecordingMapBackend {
    next_ref: u64,
    state: Arc<Mutex<ProbeState>>,
}

impl RecordingMapBackend {
    pub fn new() -> (Self, MapBackendProbe) {
        let state = Arc::new(Mutex::new(ProbeState::default()));
        (Self { next_ref: 1, state: Arc::clone(&state) }, MapBackendProbe { state })
    }

    fn mint(&mut self) -> u64 {
        let r = self.next_ref;
        self.next_ref += 1;
        r
    }
}

impl MapBackend for RecordingMapBackend {
    fn create_surface(&mut self, _container_id: &str, _center: Coordinates, _zoom: u8) -> SurfaceRef {
        self.state.lock().unwrap().stats.surfaces_created += 1;
        SurfaceRef(self.mint())
    }

    fn release_surface(&mut self, _surface: SurfaceRef) {
        self.state.lock().unwrap().stats.surfaces_released += 1;
    }

    fn place_marker(
        &mut self,
        _surface: SurfaceRef,
        _at: Coordinates,
        _options: &MarkerOptions,
    ) -> MarkerRef {
        let marker = self.mint();
        let mut state = self.state.lock().unwrap();
        state.stats.markers_placed += 1;
        state.last_marker_ref = marker;
        MarkerRef(marker)
    }

    fn move_marker(&mut self, _surface: SurfaceRef, _marker: MarkerRef, _to: Coordinates) {
        self.state.lock().unwrap().stats.markers_moved += 1;
    }

    fn drop_marker(&mut self, _surface: SurfaceRef, _marker: MarkerRef) {
        self.state.lock().unwrap().stats.markers_dropped += 1;
    }

    fn draw_polyline(
        &mut self,
        _surface: SurfaceRef,
        _points: &[Coordinates],
        _style: &PolylineStyle,
    ) -> PolylineRef {
        self.state.lock().unwrap().stats.polylines_drawn += 1;
        PolylineRef(self.mint())
    }

    fn drop_polyline(&mut self, _surface: SurfaceRef, _polyline: PolylineRef) {
        self.state.lock().unwrap().stats.polylines_dropped += 1;
    }

    fn set_view(&mut self, _surface: SurfaceRef, _center: Coordinates, _zoom: Option<u8>) {
        self.state.lock().unwrap().stats.set_view_calls += 1;
    }

    fn fit_bounds(&mut self, _surface: SurfaceRef, _bounds: GeoBounds) {
        self.state.lock().unwrap().stats.fit_calls += 1;
    }

    fn set_drag_sink(&mut self, sink: Sender<DragEvent>) {
        self.state.lock().unwrap().drag_sink = Some(sink);
    }
}
