use serde::{Deserialize, Serialize};

/// Cartesian 3-vector in an earth-centered, earth-fixed frame
pub type Vec3 = [f64; 3];

/// Orbit state vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub time: f64,           // seconds after the scene's reference midnight
    pub position: Vec3,      // [x, y, z] in meters
    pub velocity: Vec3,      // [vx, vy, vz] in m/s
}

/// Orbital travel direction of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassDirection {
    Ascending,
    Descending,
}

impl PassDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ascending" => Some(PassDirection::Ascending),
            "descending" => Some(PassDirection::Descending),
            _ => None,
        }
    }
}

impl std::fmt::Display for PassDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassDirection::Ascending => write!(f, "ascending"),
            PassDirection::Descending => write!(f, "descending"),
        }
    }
}

/// Antenna pointing side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookDirection {
    Left,
    Right,
}

impl LookDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "left" => Some(LookDirection::Left),
            "right" => Some(LookDirection::Right),
            _ => None,
        }
    }

    /// Integer code used in geodat headers (right = 1, left = -1)
    pub fn code(&self) -> i32 {
        match self {
            LookDirection::Right => 1,
            LookDirection::Left => -1,
        }
    }
}

impl std::fmt::Display for LookDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookDirection::Left => write!(f, "left"),
            LookDirection::Right => write!(f, "right"),
        }
    }
}

/// Ground point in geodetic coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundPoint {
    pub latitude: f64,   // degrees
    pub longitude: f64,  // degrees
    pub elevation: f64,  // meters above the ellipsoid
}

impl GroundPoint {
    pub fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self { latitude, longitude, elevation }
    }
}

/// Outcome of inverting the range/zero-Doppler equations for one ground point.
///
/// Non-convergence is reported through `converged` rather than an error so that
/// batch geocoding can continue past individual failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Single-look range offset from the near-range single-look sample
    pub range_pixels: f64,
    /// Azimuth line, `(t - t0) * prf`
    pub azimuth_line: f64,
    /// Azimuth time in seconds after midnight
    pub azimuth_time: f64,
    /// Slant range in meters
    pub slant_range: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Error types for scene geometry and geocoding
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("Invalid orbit: {0}")]
    InvalidOrbit(String),

    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),

    #[error("Acquisition time rolls past midnight (hour {hour} exceeds 23)")]
    MidnightRollover { hour: u32 },
}

/// Result type for geodat operations
pub type GeoResult<T> = Result<T, GeoError>;
