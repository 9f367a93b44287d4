use crate::coords::Coordinates;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// "Near" threshold used for pickup confirmation, in kilometers.
pub const DEFAULT_NEAR_THRESHOLD_KM: f64 = 0.1;

/// Great-circle distance between two lat/lon pairs in kilometers, rounded to
/// two decimals. Spherical haversine, not an ellipsoidal geodesic: the value
/// must match the distances shown elsewhere in the application.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_KM * c * 100.0).round() / 100.0
}

/// [`haversine`] over coordinate pairs.
pub fn distance_between(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Whether two points are within `threshold_km` of each other.
pub fn is_near(a: &Coordinates, b: &Coordinates, threshold_km: f64) -> bool {
    distance_between(a, b) <= threshold_km
}

/// < 1 km: whole meters; >= 1 km: km with 2 decimals.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 { format!("{:.0} m", km * 1000.0) } else { format!("{:.2} km", km) }
}
