use log::debug;
use serde::Serialize;

use crate::coords::Coordinates;
use crate::position;
use crate::resource::Resource;
use crate::viewport::{MapViewport, MarkerIcon, MarkerOptions, PolylineStyle};

/// Marker id of the user's own position.
pub const USER_MARKER_ID: &str = "user-location";

/// Polyline id of the user-to-resource route.
pub const ROUTE_POLYLINE_ID: &str = "route";

const RESOURCE_MARKER_PREFIX: &str = "resource-";

/// A resource annotated with its distance from the user, in km. `distance`
/// is only present when a user location was supplied to
/// [`sync_resource_markers`]; it serializes as an extra field next to the
/// resource's own and is omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceWithDistance {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Redraw the `resource-*` markers on `container_id` from `resources` and
/// return the distance-annotated view of the list.
///
/// Stale resource markers are removed before the new set is added, so a
/// resource that disappeared from the list disappears from the map and an
/// id never renders twice. Markers belonging to anything else (the user
/// marker, routes) are left alone. After placement the viewport is fitted
/// to the marker set.
///
/// With a `user_location`, every returned resource carries its haversine
/// distance and the list is re-sorted ascending; the sort is stable, so
/// equidistant resources keep their input order. Without one, the input
/// order comes back unchanged and no distance is attached.
///
/// Resources whose coordinates fail validation get no marker but stay in
/// the returned list. Repeated calls with identical inputs produce an
/// identical marker set and identical ordering.
pub fn sync_resource_markers(
    viewport: &mut MapViewport,
    container_id: &str,
    resources: &[Resource],
    user_location: Option<Coordinates>,
) -> Vec<ResourceWithDistance> {
    for marker_id in viewport.marker_ids(container_id) {
        if marker_id.starts_with(RESOURCE_MARKER_PREFIX) {
            viewport.remove_marker(container_id, &marker_id);
        }
    }

    let mut placed = 0usize;
    for resource in resources {
        let at = resource.coordinates();
        if !at.is_valid() {
            debug!("resource {} has no mappable location", resource.id);
            continue;
        }
        let options = MarkerOptions {
            title: Some(resource.title.clone()),
            popup: Some(resource_popup(resource)),
            icon: MarkerIcon::Resource,
            draggable: false,
        };
        if viewport.upsert_marker(
            container_id,
            &format!("{RESOURCE_MARKER_PREFIX}{}", resource.id),
            at,
            options,
        ) {
            placed += 1;
        }
    }
    if placed > 0 {
        viewport.fit_to_markers(container_id);
    }

    let mut annotated: Vec<ResourceWithDistance> = resources
        .iter()
        .map(|resource| ResourceWithDistance {
            resource: resource.clone(),
            distance: user_location
                .map(|user| position::distance_between(&user, &resource.coordinates())),
        })
        .collect();

    if user_location.is_some() {
        annotated.sort_by(|a, b| {
            a.distance.unwrap_or(0.0).total_cmp(&b.distance.unwrap_or(0.0))
        });
    }
    annotated
}

/// Place or move the user's own marker. Draggable when the surrounding
/// screen lets the user correct the position by hand; the corrected
/// coordinates come back through [`MapViewport::poll_drag_events`].
pub fn upsert_user_marker(
    viewport: &mut MapViewport,
    container_id: &str,
    at: Coordinates,
    draggable: bool,
) -> bool {
    viewport.upsert_marker(
        container_id,
        USER_MARKER_ID,
        at,
        MarkerOptions {
            title: Some("Your location".to_string()),
            popup: None,
            icon: MarkerIcon::User,
            draggable,
        },
    )
}

/// Draw (or redraw) the straight-line route from the user to a resource.
pub fn draw_route(
    viewport: &mut MapViewport,
    container_id: &str,
    from: Coordinates,
    to: Coordinates,
) -> bool {
    viewport.add_polyline(container_id, ROUTE_POLYLINE_ID, &[from, to], PolylineStyle::route())
}

fn resource_popup(resource: &Resource) -> String {
    format!(
        "<strong>{}</strong><br>{}<br><small>Category: {}</small>",
        resource.title,
        resource.description,
        resource.category.as_str()
    )
}
