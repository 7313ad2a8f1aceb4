//! geodat: orbit interpolation and range-Doppler geocoding for SAR scenes
//!
//! Reconstructs a continuous orbit from the state vectors in a geodat scene
//! description and inverts the zero-Doppler observation geometry, mapping ground
//! points (latitude, longitude, elevation) to slant range and azimuth time.

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use crate::types::{
    GeoError, GeoResult, GeocodeResult, GroundPoint, LookDirection, PassDirection, StateVector,
};

pub use crate::core::{EarthModel, GeocodingSolver, OrbitModel, SceneGeometry, SolverParams, Wgs84};
pub use crate::io::{GeodatReader, GeodatWriter, ReadOptions};

/// Python module definition
#[cfg(feature = "python")]
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PySceneGeometry>()?;
    Ok(())
}

#[cfg(feature = "python")]
fn to_py_err(e: GeoError) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e))
}

/// Python wrapper for SceneGeometry
#[cfg(feature = "python")]
#[pyclass(name = "SceneGeometry")]
struct PySceneGeometry {
    inner: SceneGeometry,
}

#[cfg(feature = "python")]
#[pymethods]
impl PySceneGeometry {
    #[new]
    #[pyo3(signature = (path, force_text = false))]
    fn new(path: String, force_text: bool) -> PyResult<Self> {
        let inner = GeodatReader::read_file(&path, ReadOptions { force_text }).map_err(to_py_err)?;
        Ok(PySceneGeometry { inner })
    }

    /// Geocode lat/lon/z to (range pixels, azimuth line, azimuth time, converged)
    #[pyo3(signature = (lat, lon, z, init_t = None))]
    fn llz_to_ra(&self, lat: f64, lon: f64, z: f64, init_t: Option<f64>) -> (f64, f64, f64, bool) {
        let result = self.inner.geocode(lat, lon, z, init_t);
        (result.range_pixels, result.azimuth_line, result.azimuth_time, result.converged)
    }

    fn time_in_scene(&self, t: f64) -> bool {
        self.inner.time_in_scene(t)
    }

    fn range_in_scene(&self, range: f64) -> bool {
        self.inner.range_in_scene(range)
    }

    fn interp_pos(&self, t: f64) -> (f64, f64, f64) {
        let [x, y, z] = self.inner.orbit().interpolate_position(t);
        (x, y, z)
    }

    fn interp_vel(&self, t: f64) -> (f64, f64, f64) {
        let [x, y, z] = self.inner.orbit().interpolate_velocity(t);
        (x, y, z)
    }

    fn theta_c_rad(&self) -> f64 {
        self.inner.incidence_angle_at_center_nominal()
    }

    fn theta_c_actual_rad(&self) -> Option<f64> {
        self.inner.incidence_angle_at_center_actual()
    }

    fn is_descending(&self) -> PyResult<bool> {
        self.inner.is_descending().map_err(to_py_err)
    }

    fn is_right_looking(&self) -> PyResult<bool> {
        self.inner.is_right_looking().map_err(to_py_err)
    }

    fn write_geodat(&self, path: String) -> PyResult<()> {
        GeodatWriter::write_file(&self.inner, &path).map_err(to_py_err)
    }

    #[getter]
    fn t0(&self) -> f64 {
        self.inner.t0()
    }

    #[getter]
    fn t1(&self) -> f64 {
        self.inner.t1()
    }

    #[getter]
    fn near_range_m(&self) -> f64 {
        self.inner.near_range_m()
    }

    #[getter]
    fn far_range_m(&self) -> f64 {
        self.inner.far_range_m()
    }

    fn __str__(&self) -> String {
        let m = self.inner.metadata();
        format!(
            "SceneGeometry(acquisition='{}', size=({}, {}), looks=({}, {}), state_vectors={})",
            m.acquisition,
            m.nr,
            m.na,
            m.nlr,
            m.nla,
            self.inner.orbit().len()
        )
    }
}
