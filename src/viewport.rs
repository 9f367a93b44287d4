use std::collections::hash_map::Entry;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use crate::coords::Coordinates;

/// Opaque handle to a live map widget minted by the [`MapBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceRef(pub u64);

/// Opaque handle to a rendered marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerRef(pub u64);

/// Opaque handle to a rendered polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolylineRef(pub u64);

/// Which icon the backend should render. Asset URLs and sizing are the
/// backend's concern; the crate only routes the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerIcon {
    /// Blue: the user's own position.
    User,
    /// Green: a donor location.
    Donor,
    /// Red: a published resource.
    #[default]
    Resource,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkerOptions {
    pub title: Option<String>,
    pub popup: Option<String>,
    pub icon: MarkerIcon,
    pub draggable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineStyle {
    pub color: String,
    pub weight: f32,
    pub opacity: f32,
}

impl Default for PolylineStyle {
    fn default() -> Self {
        Self { color: "#3b82f6".to_string(), weight: 4.0, opacity: 0.7 }
    }
}

impl PolylineStyle {
    /// Green route style for user-to-resource directions.
    pub fn route() -> Self {
        Self { color: "#10b981".to_string(), ..Self::default() }
    }
}

/// Axis-aligned box over coordinates: `north`/`south` are latitudes,
/// `east`/`west` longitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub fn around(c: Coordinates) -> Self {
        Self { north: c.latitude, south: c.latitude, east: c.longitude, west: c.longitude }
    }

    pub fn extend(&mut self, c: Coordinates) {
        self.north = self.north.max(c.latitude);
        self.south = self.south.min(c.latitude);
        self.east = self.east.max(c.longitude);
        self.west = self.west.min(c.longitude);
    }
}

/// Raw drag notification as sent by a backend adapter.
#[derive(Debug, Clone)]
pub struct DragEvent {
    pub surface: SurfaceRef,
    pub marker: MarkerRef,
    pub coordinates: Coordinates,
}

/// A drag notification translated back into container/marker ids. Draining
/// these from [`MapViewport::poll_drag_events`] is the sole path by which
/// user interaction on the map mutates crate-held coordinate state.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDragged {
    pub container_id: String,
    pub marker_id: String,
    pub coordinates: Coordinates,
}

/// The tile-based rendering capability. Implemented by an adapter around
/// the embedding application's map widget; all refs it mints stay owned by
/// the [`MapHandle`] that requested them.
pub trait MapBackend {
    fn create_surface(&mut self, container_id: &str, center: Coordinates, zoom: u8) -> SurfaceRef;
    fn release_surface(&mut self, surface: SurfaceRef);
    fn place_marker(&mut self, surface: SurfaceRef, at: Coordinates, options: &MarkerOptions) -> MarkerRef;
    fn move_marker(&mut self, surface: SurfaceRef, marker: MarkerRef, to: Coordinates);
    fn drop_marker(&mut self, surface: SurfaceRef, marker: MarkerRef);
    fn draw_polyline(
        &mut self,
        surface: SurfaceRef,
        points: &[Coordinates],
        style: &PolylineStyle,
    ) -> PolylineRef;
    fn drop_polyline(&mut self, surface: SurfaceRef, polyline: PolylineRef);
    fn set_view(&mut self, surface: SurfaceRef, center: Coordinates, zoom: Option<u8>);
    fn fit_bounds(&mut self, surface: SurfaceRef, bounds: GeoBounds);

    /// Where drag notifications for draggable markers go. Adapters that
    /// cannot produce drags may ignore this.
    fn set_drag_sink(&mut self, _sink: Sender<DragEvent>) {}
}

#[derive(Debug)]
struct Marker {
    handle: MarkerRef,
    coordinates: Coordinates,
    options: MarkerOptions,
}

#[derive(Debug)]
struct Polyline {
    handle: PolylineRef,
    points: Vec<Coordinates>,
    style: PolylineStyle,
}

/// Per-container state: the backend surface plus the marker/polyline tables
/// that own every primitive drawn on it.
pub struct MapHandle {
    surface: SurfaceRef,
    markers: FxHashMap<String, Marker>,
    polylines: FxHashMap<String, Polyline>,
}

impl MapHandle {
    fn new(surface: SurfaceRef) -> Self {
        Self { surface, markers: FxHashMap::default(), polylines: FxHashMap::default() }
    }

    pub fn surface(&self) -> SurfaceRef {
        self.surface
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker_ids(&self) -> Vec<String> {
        self.markers.keys().cloned().collect()
    }

    pub fn polyline_ids(&self) -> Vec<String> {
        self.polylines.keys().cloned().collect()
    }

    fn bounds(&self) -> Option<GeoBounds> {
        let mut markers = self.markers.values();
        let mut bounds = GeoBounds::around(markers.next()?.coordinates);
        for marker in markers {
            bounds.extend(marker.coordinates);
        }
        Some(bounds)
    }
}

/// Registry of live map widgets keyed by container id.
///
/// Runs on the UI loop: `&mut self` everywhere, no locks. Operations on an
/// unknown container id report `false`/`None` instead of failing — screens
/// tear maps down asynchronously and a straggling call is an expected race,
/// not a defect. Surfaces are released only by [`destroy`](Self::destroy);
/// nothing here is collected implicitly, since the widget under each handle
/// binds to a live rendering surface.
pub struct MapViewport {
    backend: Box<dyn MapBackend>,
    maps: FxHashMap<String, MapHandle>,
    drag_events: Receiver<DragEvent>,
}

impl MapViewport {
    pub fn new(mut backend: Box<dyn MapBackend>) -> Self {
        let (tx, rx) = unbounded();
        backend.set_drag_sink(tx);
        Self { backend, maps: FxHashMap::default(), drag_events: rx }
    }

    /// Create the map for `container_id`, or return the existing handle if
    /// one is already live. Guards against re-entrant initialization during
    /// component lifecycle churn: the second call must not spawn a second
    /// widget in the same container.
    pub fn create(&mut self, container_id: &str, center: Coordinates, zoom: u8) -> &MapHandle {
        match self.maps.entry(container_id.to_string()) {
            Entry::Occupied(entry) => {
                warn!("map {container_id} already exists");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let surface = self.backend.create_surface(container_id, center, zoom);
                info!("map {container_id} initialized");
                entry.insert(MapHandle::new(surface))
            }
        }
    }

    pub fn contains(&self, container_id: &str) -> bool {
        self.maps.contains_key(container_id)
    }

    pub fn handle(&self, container_id: &str) -> Option<&MapHandle> {
        self.maps.get(container_id)
    }

    /// Release the widget and every primitive drawn on it. `false` for an
    /// unknown id.
    pub fn destroy(&mut self, container_id: &str) -> bool {
        let Some(mut handle) = self.maps.remove(container_id) else {
            debug!("destroy: map {container_id} not found");
            return false;
        };
        for (_, marker) in handle.markers.drain() {
            self.backend.drop_marker(handle.surface, marker.handle);
        }
        for (_, polyline) in handle.polylines.drain() {
            self.backend.drop_polyline(handle.surface, polyline.handle);
        }
        self.backend.release_surface(handle.surface);
        info!("map {container_id} destroyed");
        true
    }

    /// Create or reposition a marker. Repositioning with unchanged options
    /// moves the existing primitive; changed options replace it
    /// (remove before re-add, so the id never renders twice).
    pub fn upsert_marker(
        &mut self,
        container_id: &str,
        marker_id: &str,
        at: Coordinates,
        options: MarkerOptions,
    ) -> bool {
        if !at.is_valid() {
            warn!("marker {marker_id}: refusing invalid coordinates {}", at.format());
            return false;
        }
        let Some(handle) = self.maps.get_mut(container_id) else {
            warn!("map {container_id} not found");
            return false;
        };

        if let Some(existing) = handle.markers.get_mut(marker_id) {
            if existing.options == options {
                self.backend.move_marker(handle.surface, existing.handle, at);
                existing.coordinates = at;
                return true;
            }
            self.backend.drop_marker(handle.surface, existing.handle);
            handle.markers.remove(marker_id);
        }

        let marker = self.backend.place_marker(handle.surface, at, &options);
        handle
            .markers
            .insert(marker_id.to_string(), Marker { handle: marker, coordinates: at, options });
        true
    }

    pub fn remove_marker(&mut self, container_id: &str, marker_id: &str) -> bool {
        let Some(handle) = self.maps.get_mut(container_id) else {
            return false;
        };
        let Some(marker) = handle.markers.remove(marker_id) else {
            debug!("marker {marker_id} not found on {container_id}");
            return false;
        };
        self.backend.drop_marker(handle.surface, marker.handle);
        true
    }

    pub fn clear_markers(&mut self, container_id: &str) -> bool {
        let Some(handle) = self.maps.get_mut(container_id) else {
            return false;
        };
        for (_, marker) in handle.markers.drain() {
            self.backend.drop_marker(handle.surface, marker.handle);
        }
        true
    }

    pub fn marker_ids(&self, container_id: &str) -> Vec<String> {
        self.maps.get(container_id).map(MapHandle::marker_ids).unwrap_or_default()
    }

    pub fn marker_position(&self, container_id: &str, marker_id: &str) -> Option<Coordinates> {
        Some(self.maps.get(container_id)?.markers.get(marker_id)?.coordinates)
    }

    pub fn polyline_points(&self, container_id: &str, polyline_id: &str) -> Option<&[Coordinates]> {
        Some(self.maps.get(container_id)?.polylines.get(polyline_id)?.points.as_slice())
    }

    pub fn polyline_style(&self, container_id: &str, polyline_id: &str) -> Option<&PolylineStyle> {
        Some(&self.maps.get(container_id)?.polylines.get(polyline_id)?.style)
    }

    /// Draw a polyline; a line already registered under `polyline_id` is
    /// removed first. Needs two valid points.
    pub fn add_polyline(
        &mut self,
        container_id: &str,
        polyline_id: &str,
        points: &[Coordinates],
        style: PolylineStyle,
    ) -> bool {
        if points.len() < 2 || points.iter().any(|p| !p.is_valid()) {
            warn!("polyline {polyline_id}: refusing degenerate point list");
            return false;
        }
        let Some(handle) = self.maps.get_mut(container_id) else {
            warn!("map {container_id} not found");
            return false;
        };

        if let Some(existing) = handle.polylines.remove(polyline_id) {
            self.backend.drop_polyline(handle.surface, existing.handle);
        }
        let polyline = self.backend.draw_polyline(handle.surface, points, &style);
        handle.polylines.insert(
            polyline_id.to_string(),
            Polyline { handle: polyline, points: points.to_vec(), style },
        );
        true
    }

    pub fn remove_polyline(&mut self, container_id: &str, polyline_id: &str) -> bool {
        let Some(handle) = self.maps.get_mut(container_id) else {
            return false;
        };
        let Some(polyline) = handle.polylines.remove(polyline_id) else {
            return false;
        };
        self.backend.drop_polyline(handle.surface, polyline.handle);
        true
    }

    /// Center the view, optionally changing zoom.
    pub fn center(&mut self, container_id: &str, at: Coordinates, zoom: Option<u8>) -> bool {
        let Some(handle) = self.maps.get(container_id) else {
            return false;
        };
        self.backend.set_view(handle.surface, at, zoom);
        true
    }

    /// Adjust the view to cover every current marker. With zero markers the
    /// view is left alone (absence of data is not an error).
    pub fn fit_to_markers(&mut self, container_id: &str) -> bool {
        let Some(handle) = self.maps.get(container_id) else {
            warn!("map {container_id} not found");
            return false;
        };
        if let Some(bounds) = handle.bounds() {
            self.backend.fit_bounds(handle.surface, bounds);
        }
        true
    }

    /// Bounding box over current markers; `None` for an unknown container
    /// or an empty marker set.
    pub fn bounds(&self, container_id: &str) -> Option<GeoBounds> {
        self.maps.get(container_id)?.bounds()
    }

    /// Drain pending drag notifications, write each new position back into
    /// the owning marker table, and return the translated events. Events
    /// for primitives that were torn down in the meantime are dropped.
    pub fn poll_drag_events(&mut self) -> Vec<MarkerDragged> {
        let mut dragged = Vec::new();
        while let Ok(event) = self.drag_events.try_recv() {
            let Some((container_id, handle)) =
                self.maps.iter_mut().find(|(_, h)| h.surface == event.surface)
            else {
                debug!("drag event for released surface {:?}", event.surface);
                continue;
            };
            let Some((marker_id, marker)) =
                handle.markers.iter_mut().find(|(_, m)| m.handle == event.marker)
            else {
                debug!("drag event for removed marker {:?}", event.marker);
                continue;
            };
            marker.coordinates = event.coordinates;
            dragged.push(MarkerDragged {
                container_id: container_id.clone(),
                marker_id: marker_id.clone(),
                coordinates: event.coordinates,
            });
        }
        dragged
    }
}
