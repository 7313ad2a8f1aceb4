use crate::types::{GeoError, GeoResult, Vec3};

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = 0.00669437999014;

/// Oblate-spheroid earth radius model built from the scene's own ellipsoid axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthModel {
    re_major: f64,
    re_minor: f64,
}

impl EarthModel {
    /// Create a model from semi-major and semi-minor axes in meters
    pub fn new(re_major: f64, re_minor: f64) -> GeoResult<Self> {
        if !(re_minor > 0.0 && re_major >= re_minor) {
            return Err(GeoError::MalformedMetadata(format!(
                "ellipsoid axes must satisfy ReMajor >= ReMinor > 0 (got {} / {})",
                re_major, re_minor
            )));
        }
        Ok(Self { re_major, re_minor })
    }

    pub fn semi_major_m(&self) -> f64 {
        self.re_major
    }

    pub fn semi_minor_m(&self) -> f64 {
        self.re_minor
    }

    /// Geocentric radius of the ellipsoid surface at a geodetic latitude (radians)
    pub fn radius_at_latitude(&self, lat: f64) -> f64 {
        let (sin_lat, cos_lat) = lat.sin_cos();
        let n = self.re_major.powi(2)
            / ((self.re_major * cos_lat).powi(2) + (self.re_minor * sin_lat).powi(2)).sqrt();
        let x = n * cos_lat;
        let z = (self.re_minor / self.re_major).powi(2) * n * sin_lat;
        (x * x + z * z).sqrt()
    }
}

/// Geodetic <-> earth-centered, earth-fixed conversion
pub trait GeodeticTransform: Send + Sync {
    /// Latitude/longitude in degrees, height in meters -> ECEF meters
    fn geodetic_to_ecef(&self, lat: f64, lon: f64, height: f64) -> Vec3;

    /// ECEF meters -> (latitude deg, longitude deg, height m)
    fn ecef_to_geodetic(&self, ecef: Vec3) -> (f64, f64, f64);
}

/// WGS84 datum transform
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84;

impl GeodeticTransform for Wgs84 {
    fn geodetic_to_ecef(&self, lat: f64, lon: f64, height: f64) -> Vec3 {
        let lat_rad = lat.to_radians();
        let lon_rad = lon.to_radians();

        let n = WGS84_SEMI_MAJOR / (1.0 - WGS84_E2 * lat_rad.sin().powi(2)).sqrt();

        let x = (n + height) * lat_rad.cos() * lon_rad.cos();
        let y = (n + height) * lat_rad.cos() * lon_rad.sin();
        let z = (n * (1.0 - WGS84_E2) + height) * lat_rad.sin();

        [x, y, z]
    }

    fn ecef_to_geodetic(&self, ecef: Vec3) -> (f64, f64, f64) {
        let [x, y, z] = ecef;
        let p = (x * x + y * y).sqrt();
        let lon = y.atan2(x);

        // Fixed-point iteration on latitude, converges to sub-millimeter in a few steps
        let mut lat = z.atan2(p * (1.0 - WGS84_E2));
        let mut height = 0.0;
        for _ in 0..10 {
            let sin_lat = lat.sin();
            let n = WGS84_SEMI_MAJOR / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
            height = if lat.cos().abs() > 1e-10 {
                p / lat.cos() - n
            } else {
                z.abs() - n * (1.0 - WGS84_E2)
            };
            let next = z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
            let done = (next - lat).abs() < 1e-14;
            lat = next;
            if done {
                break;
            }
        }

        (lat.to_degrees(), lon.to_degrees(), height)
    }
}
