use crate::Location;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS: f64 = 6371.0088;

/// Below this many kilometers, the equirectangular estimate is used as is.
const PLANAR_THRESHOLD: f64 = 1.5;

/// Great-circle distance between two points in kilometers.
///
/// A cheap equirectangular approximation is computed first. Short distances (below 1.5 km)
/// are returned directly; anything longer is recomputed with the haversine formula.
#[must_use]
pub fn distance(from: Location, to: Location) -> f64 {
    let (lat1, lon1) = (from.lat.to_radians(), from.lon.to_radians());
    let (lat2, lon2) = (to.lat.to_radians(), to.lon.to_radians());
    let x = (lon2 - lon1) * ((lat1 + lat2) / 2.0).cos();
    let y = lat2 - lat1;
    let planar = x.hypot(y) * EARTH_RADIUS;
    if planar < PLANAR_THRESHOLD {
        planar
    } else {
        haversine(lat1, lon1, lat2, lon2)
    }
}

fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().atan2((1.0 - a).sqrt()) * EARTH_RADIUS
}
