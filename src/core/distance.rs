use crate::models::{BoundingBox, GeoPoint};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two points in kilometers
#[inline]
pub fn distance_between(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Calculate a bounding box around a center point
///
/// Cheap pre-filter for radius queries; the exact check is still
/// `distance_between`. The longitude extent is the spherical one,
/// `asin(sin(r / R) / cos(lat))`, so the box never cuts into the circle.
/// Longitudes may run past ±180 when the circle crosses the antimeridian,
/// see `longitude_ranges`.
pub fn calculate_bounding_box(center: &GeoPoint, radius_km: f64) -> BoundingBox {
    let angular = radius_km / EARTH_RADIUS_KM;
    let lat_delta = angular.to_degrees();
    let min_lat = (center.latitude - lat_delta).max(-90.0);
    let max_lat = (center.latitude + lat_delta).min(90.0);

    // A circle reaching a pole covers every longitude
    let full = BoundingBox {
        min_lat,
        max_lat,
        min_lon: -180.0,
        max_lon: 180.0,
    };
    if angular >= std::f64::consts::FRAC_PI_2 || min_lat <= -90.0 || max_lat >= 90.0 {
        return full;
    }

    let ratio = angular.sin() / center.latitude.to_radians().cos();
    if !(0.0..1.0).contains(&ratio) {
        return full;
    }
    let lon_delta = ratio.asin().to_degrees();
    if lon_delta >= 180.0 {
        return full;
    }

    BoundingBox {
        min_lat,
        max_lat,
        min_lon: center.longitude - lon_delta,
        max_lon: center.longitude + lon_delta,
    }
}

/// Longitude intervals covered by a box, within [-180, 180]
///
/// A box crossing the antimeridian is split into two intervals.
pub fn longitude_ranges(bbox: &BoundingBox) -> ((f64, f64), Option<(f64, f64)>) {
    if bbox.max_lon - bbox.min_lon >= 360.0 {
        ((-180.0, 180.0), None)
    } else if bbox.min_lon < -180.0 {
        ((bbox.min_lon + 360.0, 180.0), Some((-180.0, bbox.max_lon)))
    } else if bbox.max_lon > 180.0 {
        ((bbox.min_lon, 180.0), Some((-180.0, bbox.max_lon - 360.0)))
    } else {
        ((bbox.min_lon, bbox.max_lon), None)
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: &GeoPoint, bbox: &BoundingBox) -> bool {
    if point.latitude < bbox.min_lat || point.latitude > bbox.max_lat {
        return false;
    }
    let within = |(min, max): (f64, f64)| point.longitude >= min && point.longitude <= max;
    let (first, second) = longitude_ranges(bbox);
    within(first) || second.map_or(false, within)
}
