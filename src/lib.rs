//! Geolocation acquisition and spatial matching for the resource-share app.
//!
//! This crate provides:
//! - device fix acquisition with permission gates and cooperative timeouts
//! - continuous watch subscriptions with idempotent cancellation
//! - mode-aware location caching with TTL and fetch coalescing
//! - haversine distances and proximity checks
//! - map surface/marker/polyline bookkeeping behind a rendering seam
//! - resource marker synchronization with distance-sorted views
//!
//! The device location capability and the tile map widget are consumed
//! through the [`GeoBackend`] and [`MapBackend`] traits; platform adapters
//! live with the embedding application.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use geoshare::{LocationCache, LocationProvider, STATIC_MODE};
//! # fn backend() -> Arc<dyn geoshare::GeoBackend> { unimplemented!() }
//!
//! let cache = LocationCache::new(LocationProvider::new(backend()));
//! match cache.get_or_fetch(&STATIC_MODE) {
//!     Ok(fix) => println!("user is at {}", fix.format()),
//!     Err(err) => println!("{err}"),
//! }
//! ```

pub mod cache;
pub mod coords;
pub mod error;
pub mod position;
pub mod provider;
pub mod resource;
pub mod sync;
pub mod viewport;

#[cfg(test)]
mod testutil;

pub use cache::{DYNAMIC_MODE, LocationCache, LocationMode, ModeKind, STATIC_MODE};
pub use coords::{Coordinates, DEFAULT_LOCATION};
pub use error::{GeolocationError, GeolocationErrorKind};
pub use position::{
    DEFAULT_NEAR_THRESHOLD_KM, distance_between, format_distance, haversine, is_near,
};
pub use provider::{
    GeoBackend, LocationProvider, PermissionState, PlatformError, PositionRequest, WatchId,
    WatchSubscription,
};
pub use resource::{Resource, ResourceCategory, ResourceStatus};
pub use sync::{
    ROUTE_POLYLINE_ID, ResourceWithDistance, USER_MARKER_ID, draw_route, sync_resource_markers,
    upsert_user_marker,
};
pub use viewport::{
    DragEvent, GeoBounds, MapBackend, MapHandle, MapViewport, MarkerDragged, MarkerIcon,
    MarkerOptions, MarkerRef, PolylineRef, PolylineStyle, SurfaceRef,
};
