use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, warn};

use crate::coords::{Coordinates, DEFAULT_LOCATION};
use crate::error::{GeolocationError, GeolocationErrorKind};
use crate::provider::LocationProvider;

/// Cache key: one slot per kind, regardless of the timings carried by the
/// mode value used for a particular call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Static,
    Dynamic,
}

/// Named acquisition configuration. The two canonical presets are
/// [`STATIC_MODE`] (slow screens: publish, browse) and [`DYNAMIC_MODE`]
/// (live tracking while a receiver is in transit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationMode {
    pub kind: ModeKind,
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub max_cache_age: Duration,
}

impl LocationMode {
    /// A preset with custom timings; used by callers with unusual freshness
    /// needs and by tests.
    pub const fn with_timings(kind: ModeKind, timeout: Duration, max_cache_age: Duration) -> Self {
        Self { kind, high_accuracy: true, timeout, max_cache_age }
    }
}

pub const STATIC_MODE: LocationMode = LocationMode {
    kind: ModeKind::Static,
    high_accuracy: true,
    timeout: Duration::from_secs(15),
    max_cache_age: Duration::from_secs(300),
};

pub const DYNAMIC_MODE: LocationMode = LocationMode {
    kind: ModeKind::Dynamic,
    high_accuracy: true,
    timeout: Duration::from_secs(10),
    max_cache_age: Duration::from_secs(5),
};

#[derive(Debug, Clone)]
struct CacheEntry {
    coordinates: Coordinates,
    fetched_at: Instant,
}

type FetchResult = Result<Coordinates, GeolocationError>;

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    fetch_in_flight: bool,
    waiters: Vec<Sender<FetchResult>>,
}

struct CacheState {
    slots: [Slot; 2],
    dynamic_enabled: bool,
}

enum Step {
    Join(Receiver<FetchResult>),
    Fetch,
}

impl Step {
    /// Join the in-flight fetch for this slot, or claim it.
    fn join_or_claim(slot: &mut Slot) -> Self {
        if slot.fetch_in_flight {
            let (tx, rx) = bounded(1);
            slot.waiters.push(tx);
            Step::Join(rx)
        } else {
            slot.fetch_in_flight = true;
            Step::Fetch
        }
    }
}

/// Mode-aware memoization over a [`LocationProvider`].
///
/// Every call takes its mode explicitly; the only ambient state is the
/// dynamic-mode toggle consulted by the `active`-flavored conveniences.
/// Shared-state bookkeeping sits behind a mutex that is never held across a
/// hardware request, so the cache can be used from several threads behind an
/// `Arc`: concurrent `get_or_fetch` calls for one kind coalesce onto a
/// single underlying acquisition.
pub struct LocationCache {
    provider: LocationProvider,
    state: Mutex<CacheState>,
}

fn slot_index(kind: ModeKind) -> usize {
    match kind {
        ModeKind::Static => 0,
        ModeKind::Dynamic => 1,
    }
}

impl LocationCache {
    pub fn new(provider: LocationProvider) -> Self {
        Self {
            provider,
            state: Mutex::new(CacheState {
                slots: [Slot::default(), Slot::default()],
                dynamic_enabled: false,
            }),
        }
    }

    pub fn provider(&self) -> &LocationProvider {
        &self.provider
    }

    /// Cached coordinates if the entry is younger than `mode.max_cache_age`,
    /// otherwise one underlying acquisition. Callers arriving while that
    /// acquisition is outstanding wait for its result instead of issuing
    /// duplicate hardware requests.
    pub fn get_or_fetch(&self, mode: &LocationMode) -> FetchResult {
        let step = {
            let mut state = self.lock();
            let slot = &mut state.slots[slot_index(mode.kind)];
            if let Some(entry) = &slot.entry
                && entry.fetched_at.elapsed() < mode.max_cache_age
            {
                debug!("cache hit for {:?} mode", mode.kind);
                return Ok(entry.coordinates);
            }
            Step::join_or_claim(slot)
        };

        match step {
            Step::Join(rx) => Self::await_coalesced(rx),
            Step::Fetch => self.run_fetch(mode),
        }
    }

    /// Always acquires, ignoring any cached entry. An in-flight fetch for
    /// the same kind is joined rather than duplicated: it is already as
    /// fresh as a new request would be.
    pub fn force_refresh(&self, mode: &LocationMode) -> FetchResult {
        let step = {
            let mut state = self.lock();
            Step::join_or_claim(&mut state.slots[slot_index(mode.kind)])
        };

        match step {
            Step::Join(rx) => Self::await_coalesced(rx),
            Step::Fetch => self.run_fetch(mode),
        }
    }

    /// Clear one entry.
    pub fn invalidate(&self, kind: ModeKind) {
        self.lock().slots[slot_index(kind)].entry = None;
    }

    /// Clear both entries.
    pub fn invalidate_all(&self) {
        let mut state = self.lock();
        for slot in &mut state.slots {
            slot.entry = None;
        }
    }

    /// Most recently fetched coordinates across both modes, regardless of
    /// TTL validity. `None` until the first successful fetch.
    pub fn last_known(&self) -> Option<Coordinates> {
        let state = self.lock();
        state
            .slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .max_by_key(|e| e.fetched_at)
            .map(|e| e.coordinates)
    }

    /// Switch the `active`-flavored calls to the dynamic preset.
    pub fn enable_dynamic_mode(&self) {
        self.lock().dynamic_enabled = true;
    }

    /// Switch back to the static preset. The dynamic entry is cleared: a
    /// dynamic sample is not meaningful once dynamic tracking stops.
    pub fn disable_dynamic_mode(&self) {
        let mut state = self.lock();
        state.dynamic_enabled = false;
        state.slots[slot_index(ModeKind::Dynamic)].entry = None;
    }

    pub fn dynamic_mode_enabled(&self) -> bool {
        self.lock().dynamic_enabled
    }

    pub fn active_mode(&self) -> LocationMode {
        if self.dynamic_mode_enabled() { DYNAMIC_MODE } else { STATIC_MODE }
    }

    /// [`get_or_fetch`](Self::get_or_fetch) with the currently active preset.
    pub fn get_current_active(&self) -> FetchResult {
        self.get_or_fetch(&self.active_mode())
    }

    /// Degrade-to-default convenience: any acquisition failure yields the
    /// configured fallback location so the screen stays usable.
    pub fn get_or_default(&self, mode: &LocationMode) -> Coordinates {
        match self.get_or_fetch(mode) {
            Ok(coordinates) => coordinates,
            Err(err) => {
                warn!("using default location: {} ({})", err, err.raw_message());
                DEFAULT_LOCATION
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // The mutex only guards bookkeeping; a poisoned lock means a panic
        // mid-update elsewhere and there is nothing useful to salvage.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn await_coalesced(rx: Receiver<FetchResult>) -> FetchResult {
        debug!("joining in-flight fetch");
        rx.recv().unwrap_or_else(|_| {
            Err(GeolocationError::new(GeolocationErrorKind::Unknown, "coalesced fetch abandoned"))
        })
    }

    /// Performs the single underlying acquisition for this slot and fans the
    /// result out to every coalesced waiter.
    fn run_fetch(&self, mode: &LocationMode) -> FetchResult {
        let result = self.provider.acquire(mode).and_then(Self::validated);

        let waiters = {
            let mut state = self.lock();
            let slot = &mut state.slots[slot_index(mode.kind)];
            slot.fetch_in_flight = false;
            if let Ok(coordinates) = &result {
                slot.entry = Some(CacheEntry { coordinates: *coordinates, fetched_at: Instant::now() });
            }
            std::mem::take(&mut slot.waiters)
        };

        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        result
    }

    /// Out-of-range fixes and the (0,0) sentinel never reach the cache.
    fn validated(fix: Coordinates) -> FetchResult {
        if fix.is_valid() {
            Ok(fix)
        } else {
            Err(GeolocationError::new(
                GeolocationErrorKind::PositionUnavailable,
                format!("rejected invalid fix {}", fix.format()),
            ))
        }
    }
}
