/// Mean Earth radius used by the spherical approximation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A coordinate pair in degrees. Expected domain is latitude in [-90, 90] and
/// longitude in [-180, 180]; only finiteness is enforced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite() && longitude.is_finite() {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }
}

/// Great-circle distance in kilometers (haversine, no ellipsoidal correction).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

pub fn within_radius(point: GeoPoint, center: GeoPoint, radius_km: f64) -> bool {
    distance_km(point, center) <= radius_km
}
