use crate::core::earth::GeodeticTransform;
use crate::core::orbit::{dot, norm, sub, OrbitModel};
use crate::types::{GeocodeResult, GroundPoint, Vec3};

/// Newton iteration controls for the zero-Doppler solve
#[derive(Debug, Clone, Copy)]
pub struct SolverParams {
    /// Iteration cap; reaching it without meeting tolerance reports non-convergence
    pub max_iterations: usize,
    /// Stop once the time update falls below this many seconds
    pub tolerance: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-5,
        }
    }
}

/// Radar timing needed to turn a solved (time, range) into image coordinates
#[derive(Debug, Clone, Copy)]
pub struct RadarTiming {
    /// Scene start time (seconds after midnight)
    pub t0: f64,
    /// Pulse repetition frequency (Hz)
    pub prf: f64,
    /// Range to the first single-look sample (meters)
    pub near_range_single_look: f64,
    /// Single-look range pixel size (meters)
    pub slp_rg: f64,
    /// Seed time used when the caller gives none
    pub default_seed: f64,
}

/// Range/zero-Doppler geocoder for one orbit.
///
/// Solves `dot(target - sat(t), vel(t)) = 0` for `t` by Newton iteration with the
/// derivative approximated as `-|vel(t)|^2`. No Doppler bias is modeled. The result
/// is the unconstrained geometric solution; scene bounds are checked separately.
#[derive(Debug, Clone, Copy)]
pub struct GeocodingSolver<'a> {
    orbit: &'a OrbitModel,
    timing: RadarTiming,
    params: SolverParams,
}

impl<'a> GeocodingSolver<'a> {
    pub fn new(orbit: &'a OrbitModel, timing: RadarTiming) -> Self {
        Self {
            orbit,
            timing,
            params: SolverParams::default(),
        }
    }

    pub fn with_params(mut self, params: SolverParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn timing(&self) -> &RadarTiming {
        &self.timing
    }

    /// Solve for an earth-centered, earth-fixed target
    pub fn solve_ecef(&self, target: Vec3, seed: Option<f64>) -> GeocodeResult {
        let mut t = seed.unwrap_or(self.timing.default_seed);
        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..self.params.max_iterations {
            iterations += 1;
            let sat_pos = self.orbit.interpolate_position(t);
            let sat_vel = self.orbit.interpolate_velocity(t);

            let dr = sub(&target, &sat_pos);
            let df = dot(&dr, &sat_vel);
            let c1 = -dot(&sat_vel, &sat_vel);
            let step = df / c1;

            if !step.is_finite() {
                // Left the state-vector table; further updates stay NaN
                log::debug!("Geocoding left orbit coverage at t={:.6} after {} iterations", t, iterations);
                break;
            }

            t -= step;
            if step.abs() < self.params.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!(
                "Geocoding did not converge after {} iterations (t={:.6})",
                iterations,
                t
            );
        }

        let slant_range = norm(&sub(&target, &self.orbit.interpolate_position(t)));
        GeocodeResult {
            range_pixels: (slant_range - self.timing.near_range_single_look) / self.timing.slp_rg,
            azimuth_line: (t - self.timing.t0) * self.timing.prf,
            azimuth_time: t,
            slant_range,
            iterations,
            converged,
        }
    }

    /// Solve for a geodetic ground point converted through `transform`
    pub fn solve_geodetic<T: GeodeticTransform + ?Sized>(
        &self,
        transform: &T,
        point: &GroundPoint,
        seed: Option<f64>,
    ) -> GeocodeResult {
        let target = transform.geodetic_to_ecef(point.latitude, point.longitude, point.elevation);
        self.solve_ecef(target, seed)
    }

    /// Geocode independent points, in parallel when the `parallel` feature is on
    pub fn geocode_points<T: GeodeticTransform + ?Sized>(
        &self,
        transform: &T,
        points: &[GroundPoint],
    ) -> Vec<GeocodeResult> {
        log::info!("Geocoding {} ground points", points.len());
        // Build the interpolators before fanning out
        self.orbit.warm_up();

        #[cfg(feature = "parallel")]
        let results: Vec<GeocodeResult> = {
            use rayon::prelude::*;
            points
                .par_iter()
                .map(|p| self.solve_geodetic(transform, p, None))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<GeocodeResult> = points
            .iter()
            .map(|p| self.solve_geodetic(transform, p, None))
            .collect();

        let failures = results.iter().filter(|r| !r.converged).count();
        if failures > 0 {
            log::warn!("{} of {} points did not converge", failures, points.len());
        }
        results
    }

    /// Geocode points along a profile, seeding each solve with the previous converged time
    pub fn geocode_profile<T: GeodeticTransform + ?Sized>(
        &self,
        transform: &T,
        points: &[GroundPoint],
    ) -> Vec<GeocodeResult> {
        let mut seed: Option<f64> = None;
        points
            .iter()
            .map(|p| {
                let result = self.solve_geodetic(transform, p, seed);
                if result.converged {
                    seed = Some(result.azimuth_time);
                }
                result
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight_orbit() -> OrbitModel {
        OrbitModel::new(
            0.0,
            10.0,
            vec![[7_000_000.0, 0.0, 0.0], [7_000_000.0, 75_000.0, 0.0]],
            vec![[0.0, 7500.0, 0.0], [0.0, 7500.0, 0.0]],
        )
        .unwrap()
    }

    fn timing() -> RadarTiming {
        RadarTiming {
            t0: 0.0,
            prf: 100.0,
            near_range_single_look: 600_000.0,
            slp_rg: 2.0,
            default_seed: 5.0,
        }
    }

    #[test]
    fn test_straight_line_equator() {
        let orbit = straight_orbit();
        let solver = GeocodingSolver::new(&orbit, timing());
        let result = solver.solve_ecef([6_378_137.0, 0.0, 0.0], None);

        assert!(result.converged);
        assert_abs_diff_eq!(result.azimuth_time, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(result.slant_range, 621_863.0, epsilon = 1.0);
        assert_abs_diff_eq!(result.range_pixels, 10_931.5, epsilon = 0.5);
        assert_abs_diff_eq!(result.azimuth_line, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let orbit = straight_orbit();
        let solver = GeocodingSolver::new(&orbit, timing()).with_params(SolverParams {
            max_iterations: 1,
            tolerance: 1e-5,
        });
        let result = solver.solve_ecef([6_378_137.0, 0.0, 0.0], None);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_target_outside_orbit_coverage() {
        let orbit = straight_orbit();
        let solver = GeocodingSolver::new(&orbit, timing());
        // Zero-Doppler time would be -20 s, before the first state vector
        let result = solver.solve_ecef([6_378_137.0, -150_000.0, 0.0], None);
        assert!(!result.converged);
        assert!(result.iterations < 50);
    }

    #[test]
    fn test_profile_seeding() {
        let orbit = straight_orbit();
        let solver = GeocodingSolver::new(&orbit, timing());
        let transform = crate::core::earth::Wgs84;
        let points: Vec<GroundPoint> = (0..4)
            .map(|i| GroundPoint::new(0.0, 0.1 + 0.1 * i as f64, 0.0))
            .collect();

        let profile = solver.geocode_profile(&transform, &points);
        let batch = solver.geocode_points(&transform, &points);
        assert_eq!(profile.len(), 4);
        for (a, b) in profile.iter().zip(&batch) {
            assert!(a.converged && b.converged);
            assert_abs_diff_eq!(a.azimuth_time, b.azimuth_time, epsilon = 1e-4);
        }
        assert!(profile.windows(2).all(|w| w[1].azimuth_time > w[0].azimuth_time));
    }
}
