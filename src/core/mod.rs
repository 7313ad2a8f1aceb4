//! Orbit and geocoding engine

pub mod earth;
pub mod orbit;
pub mod geocoding;
pub mod scene;

// Re-export main types
pub use earth::{EarthModel, GeodeticTransform, Wgs84};
pub use orbit::{CubicSpline, OrbitModel};
pub use geocoding::{GeocodingSolver, RadarTiming, SolverParams};
pub use scene::{SceneGeometry, SceneMetadata};
