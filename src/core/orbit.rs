//! Continuous orbit reconstruction from a uniformly sampled state-vector table

use crate::types::{GeoError, GeoResult, StateVector, Vec3};
use std::fmt;
use std::sync::OnceLock;

/// Relative distance outside the knot range still treated as on the end knot
const EDGE_SLACK: f64 = 1e-12;

/// Not-a-knot cubic spline through one tabulated component.
///
/// Degrades to the interpolating quadratic for three knots and to a straight
/// line for two. Evaluation outside the knot range yields NaN.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    /// Second derivative at each knot
    moments: Vec<f64>,
}

impl CubicSpline {
    pub fn new(knots: &[f64], values: &[f64]) -> GeoResult<Self> {
        let n = knots.len();
        if n < 2 || values.len() != n {
            return Err(GeoError::InvalidOrbit(format!(
                "spline needs at least 2 knots with matching values (got {} knots, {} values)",
                n,
                values.len()
            )));
        }
        if knots.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(GeoError::InvalidOrbit(
                "spline knots must be strictly increasing".to_string(),
            ));
        }

        let moments = Self::solve_moments(knots, values);
        Ok(Self {
            knots: knots.to_vec(),
            values: values.to_vec(),
            moments,
        })
    }

    fn solve_moments(x: &[f64], y: &[f64]) -> Vec<f64> {
        let n = x.len();
        match n {
            2 => vec![0.0; 2],
            3 => {
                // Single parabola: constant second derivative 2 * f[x0, x1, x2]
                let s0 = (y[1] - y[0]) / (x[1] - x[0]);
                let s1 = (y[2] - y[1]) / (x[2] - x[1]);
                let c = 2.0 * (s1 - s0) / (x[2] - x[0]);
                vec![c; 3]
            }
            _ => {
                let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
                let m = n - 2; // unknowns M[1..=n-2]

                let mut sub = vec![0.0; m];
                let mut diag = vec![0.0; m];
                let mut sup = vec![0.0; m];
                let mut rhs = vec![0.0; m];

                for k in 0..m {
                    let i = k + 1;
                    sub[k] = h[i - 1];
                    diag[k] = 2.0 * (h[i - 1] + h[i]);
                    sup[k] = h[i];
                    rhs[k] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
                }

                // Not-a-knot at x[1]: eliminate M[0] = ((h0 + h1) M1 - h0 M2) / h1
                let (h0, h1) = (h[0], h[1]);
                diag[0] += h0 * (h0 + h1) / h1;
                sup[0] -= h0 * h0 / h1;
                sub[0] = 0.0;

                // Not-a-knot at x[n-2]: eliminate M[n-1] = ((hl + hr) M[n-2] - hr M[n-3]) / hl
                let (hl, hr) = (h[n - 3], h[n - 2]);
                diag[m - 1] += hr * (hl + hr) / hl;
                sub[m - 1] -= hr * hr / hl;
                sup[m - 1] = 0.0;

                let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs);

                let mut moments = vec![0.0; n];
                moments[1..n - 1].copy_from_slice(&interior);
                moments[0] = ((h0 + h1) * moments[1] - h0 * moments[2]) / h1;
                moments[n - 1] = ((hl + hr) * moments[n - 2] - hr * moments[n - 3]) / hl;
                moments
            }
        }
    }

    /// Evaluate the spline; NaN outside `[knots[0], knots[n-1]]`.
    ///
    /// Times within rounding distance of either end evaluate at that end knot.
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.knots.len();
        let (first, last) = (self.knots[0], self.knots[n - 1]);
        let slack = (last - first) * EDGE_SLACK;
        let t = if t < first && t >= first - slack {
            first
        } else if t > last && t <= last + slack {
            last
        } else {
            t
        };
        if !(t >= first && t <= last) {
            return f64::NAN;
        }

        // Knots reproduce their tabulated value exactly
        let idx = self.knots.partition_point(|&k| k < t);
        if idx < n && self.knots[idx] == t {
            return self.values[idx];
        }

        let i = idx - 1;
        let h = self.knots[i + 1] - self.knots[i];
        let a = self.knots[i + 1] - t;
        let b = t - self.knots[i];
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (self.values[i] / h - m0 * h / 6.0) * a
            + (self.values[i + 1] / h - m1 * h / 6.0) * b
    }
}

/// Thomas algorithm for a tridiagonal system
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    c[0] = sup[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - sub[i] * c[i - 1];
        c[i] = sup[i] / denom;
        d[i] = (rhs[i] - sub[i] * d[i - 1]) / denom;
    }

    let mut x = vec![0.0; n];
    x[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d[i] - c[i] * x[i + 1];
    }
    x
}

/// Per-axis interpolators, built once per orbit
#[derive(Debug)]
struct OrbitSplines {
    position: [CubicSpline; 3],
    velocity: [CubicSpline; 3],
}

/// Uniformly time-sampled orbit with lazily built cubic interpolators.
///
/// The interpolator cache sits behind a `OnceLock`, so concurrent first use from
/// several threads builds it exactly once.
#[derive(Debug)]
pub struct OrbitModel {
    t_state: f64,
    dt_state: f64,
    state_vectors: Vec<StateVector>,
    splines: OnceLock<OrbitSplines>,
}

impl OrbitModel {
    /// Build from the time of the first vector, the sample spacing and the tables
    pub fn new(
        t_state: f64,
        dt_state: f64,
        positions: Vec<Vec3>,
        velocities: Vec<Vec3>,
    ) -> GeoResult<Self> {
        if positions.len() < 2 {
            return Err(GeoError::InvalidOrbit(format!(
                "at least 2 state vectors required, got {}",
                positions.len()
            )));
        }
        if positions.len() != velocities.len() {
            return Err(GeoError::InvalidOrbit(format!(
                "{} positions but {} velocities",
                positions.len(),
                velocities.len()
            )));
        }
        if !(dt_state > 0.0) || !dt_state.is_finite() || !t_state.is_finite() {
            return Err(GeoError::InvalidOrbit(format!(
                "state vector spacing must be positive (t0={}, dt={})",
                t_state, dt_state
            )));
        }

        let state_vectors: Vec<StateVector> = positions
            .into_iter()
            .zip(velocities)
            .enumerate()
            .map(|(i, (position, velocity))| StateVector {
                time: t_state + i as f64 * dt_state,
                position,
                velocity,
            })
            .collect();

        // Spacing below the resolution of t_state collapses the sample times
        if let Some(w) = state_vectors
            .windows(2)
            .find(|w| !(w[1].time > w[0].time) || !w[1].time.is_finite())
        {
            return Err(GeoError::InvalidOrbit(format!(
                "state vector times not strictly increasing and finite ({} then {}; t0={}, dt={})",
                w[0].time, w[1].time, t_state, dt_state
            )));
        }

        Ok(Self {
            t_state,
            dt_state,
            state_vectors,
            splines: OnceLock::new(),
        })
    }

    pub fn t_state(&self) -> f64 {
        self.t_state
    }

    pub fn dt_state(&self) -> f64 {
        self.dt_state
    }

    pub fn len(&self) -> usize {
        self.state_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state_vectors.is_empty()
    }

    pub fn state_vectors(&self) -> &[StateVector] {
        &self.state_vectors
    }

    pub fn state_times(&self) -> Vec<f64> {
        self.state_vectors.iter().map(|sv| sv.time).collect()
    }

    /// First and last tabulated times
    pub fn time_span(&self) -> (f64, f64) {
        let first = self.state_vectors[0].time;
        let last = self.state_vectors[self.state_vectors.len() - 1].time;
        (first, last)
    }

    pub fn contains_time(&self, t: f64) -> bool {
        let (first, last) = self.time_span();
        t >= first && t <= last
    }

    /// Build the interpolator cache ahead of concurrent use
    pub fn warm_up(&self) {
        self.splines();
    }

    fn splines(&self) -> &OrbitSplines {
        self.splines.get_or_init(|| {
            log::debug!(
                "Building orbit interpolators over {} state vectors ({:.3}s spacing)",
                self.state_vectors.len(),
                self.dt_state
            );
            let times = self.state_times();
            let axis = |pick: &dyn Fn(&StateVector) -> f64| -> CubicSpline {
                let values: Vec<f64> = self.state_vectors.iter().map(pick).collect();
                // Construction guarantees at least two strictly increasing times
                CubicSpline::new(&times, &values).unwrap_or_else(|e| {
                    unreachable!("orbit table validated at construction: {}", e)
                })
            };
            OrbitSplines {
                position: [
                    axis(&|sv: &StateVector| sv.position[0]),
                    axis(&|sv: &StateVector| sv.position[1]),
                    axis(&|sv: &StateVector| sv.position[2]),
                ],
                velocity: [
                    axis(&|sv: &StateVector| sv.velocity[0]),
                    axis(&|sv: &StateVector| sv.velocity[1]),
                    axis(&|sv: &StateVector| sv.velocity[2]),
                ],
            }
        })
    }

    /// Satellite position at `t`; NaN components outside the table
    pub fn interpolate_position(&self, t: f64) -> Vec3 {
        let s = &self.splines().position;
        [s[0].evaluate(t), s[1].evaluate(t), s[2].evaluate(t)]
    }

    /// Satellite velocity at `t`; NaN components outside the table
    pub fn interpolate_velocity(&self, t: f64) -> Vec3 {
        let s = &self.splines().velocity;
        [s[0].evaluate(t), s[1].evaluate(t), s[2].evaluate(t)]
    }

    /// Distance of the satellite from the earth's center at `t`
    pub fn geocentric_distance(&self, t: f64) -> f64 {
        norm(&self.interpolate_position(t))
    }
}

impl Clone for OrbitModel {
    fn clone(&self) -> Self {
        Self {
            t_state: self.t_state,
            dt_state: self.dt_state,
            state_vectors: self.state_vectors.clone(),
            splines: OnceLock::new(),
        }
    }
}

impl PartialEq for OrbitModel {
    fn eq(&self, other: &Self) -> bool {
        self.t_state == other.t_state
            && self.dt_state == other.dt_state
            && self.state_vectors == other.state_vectors
    }
}

impl fmt::Display for OrbitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} ({}, 3)", self.t_state, self.dt_state, self.state_vectors.len())?;
        for sv in &self.state_vectors {
            writeln!(
                f,
                "{:10.4} {:8.1} {:8.1} {:8.1} {:8.1} {:8.1} {:8.1}",
                sv.time,
                sv.position[0],
                sv.position[1],
                sv.position[2],
                sv.velocity[0],
                sv.velocity[1],
                sv.velocity[2]
            )?;
        }
        Ok(())
    }
}

pub(crate) fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn circular_orbit(n: usize, dt: f64) -> OrbitModel {
        let radius = 7_000_000.0_f64;
        let omega = (3.986004418e14_f64 / radius.powi(3)).sqrt();
        let (mut pos, mut vel) = (Vec::new(), Vec::new());
        for i in 0..n {
            let phase = omega * (i as f64 * dt);
            pos.push([radius * phase.cos(), radius * phase.sin(), 0.0]);
            vel.push([-radius * omega * phase.sin(), radius * omega * phase.cos(), 0.0]);
        }
        OrbitModel::new(0.0, dt, pos, vel).unwrap()
    }

    #[test]
    fn test_spline_reproduces_cubic() {
        let x: Vec<f64> = (0..6).map(|i| i as f64 * 2.0).collect();
        let y: Vec<f64> = x.iter().map(|t| 0.5 * t.powi(3) - t * t + 3.0).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for t in [0.3, 1.7, 4.4, 7.9, 9.99] {
            let expected = 0.5 * t * t * t - t * t + 3.0;
            assert_abs_diff_eq!(spline.evaluate(t), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_spline_three_and_two_knots() {
        let quad = CubicSpline::new(&[0.0, 1.0, 2.0], &[1.0, 2.0, 5.0]).unwrap();
        // y = t^2 + 1
        assert_abs_diff_eq!(quad.evaluate(1.5), 3.25, epsilon = 1e-12);

        let line = CubicSpline::new(&[0.0, 10.0], &[0.0, 75_000.0]).unwrap();
        assert_abs_diff_eq!(line.evaluate(2.5), 18_750.0, epsilon = 1e-9);
    }

    #[test]
    fn test_spline_out_of_range_is_nan() {
        let line = CubicSpline::new(&[0.0, 10.0], &[0.0, 1.0]).unwrap();
        assert!(line.evaluate(-0.001).is_nan());
        assert!(line.evaluate(10.001).is_nan());
        assert!(line.evaluate(f64::NAN).is_nan());
    }

    #[test]
    fn test_knots_exact() {
        let orbit = circular_orbit(9, 10.0);
        for sv in orbit.state_vectors() {
            assert_eq!(orbit.interpolate_position(sv.time), sv.position);
            assert_eq!(orbit.interpolate_velocity(sv.time), sv.velocity);
        }
    }

    #[test]
    fn test_invalid_orbit() {
        let one = OrbitModel::new(0.0, 10.0, vec![[7e6, 0.0, 0.0]], vec![[0.0, 7500.0, 0.0]]);
        assert!(matches!(one, Err(GeoError::InvalidOrbit(_))));

        let pos = vec![[7e6, 0.0, 0.0]; 3];
        let vel = vec![[0.0, 7500.0, 0.0]; 3];
        assert!(OrbitModel::new(0.0, 0.0, pos.clone(), vel.clone()).is_err());
        assert!(OrbitModel::new(0.0, -1.0, pos.clone(), vel.clone()).is_err());
        assert!(OrbitModel::new(0.0, 1.0, pos, vel[..2].to_vec()).is_err());
    }

    #[test]
    fn test_collapsed_state_times_rejected() {
        let pos = vec![[7e6, 0.0, 0.0]; 3];
        let vel = vec![[0.0, 7500.0, 0.0]; 3];

        // 1.0 is below the spacing of representable values near 1e17
        let coarse = OrbitModel::new(1e17, 1.0, pos.clone(), vel.clone());
        assert!(matches!(coarse, Err(GeoError::InvalidOrbit(_))));

        let subnormal = OrbitModel::new(43_500.0, 5e-324, pos.clone(), vel.clone());
        assert!(matches!(subnormal, Err(GeoError::InvalidOrbit(_))));

        let overflow = OrbitModel::new(1e308, 1e308, pos, vel);
        assert!(matches!(overflow, Err(GeoError::InvalidOrbit(_))));
    }

    #[test]
    fn test_knots_exact_small_tables() {
        for n in 2..=5 {
            let x: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 10.0).collect();
            let y: Vec<f64> = x.iter().map(|t| (t * 0.013).sin() * 7.0e6).collect();
            let spline = CubicSpline::new(&x, &y).unwrap();
            for (t, v) in x.iter().zip(&y) {
                assert_eq!(spline.evaluate(*t), *v, "n={} t={}", n, t);
            }
            assert!(spline.evaluate(x[0] + 5.0).is_finite(), "n={}", n);
        }
    }

    #[test]
    fn test_four_knots_reproduce_cubic() {
        let cubic = |t: f64| 2.0 * t.powi(3) - 5.0 * t * t + t - 4.0;
        let x = [0.0, 1.0, 3.0, 4.5];
        let y: Vec<f64> = x.iter().map(|&t| cubic(t)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for t in [0.25, 0.9, 2.0, 3.7, 4.4] {
            assert_abs_diff_eq!(spline.evaluate(t), cubic(t), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_circular_orbit_radius_between_knots() {
        let orbit = circular_orbit(13, 10.0);
        for t in [5.0, 33.3, 61.7, 114.2] {
            assert_abs_diff_eq!(orbit.geocentric_distance(t), 7_000_000.0, epsilon = 0.05);
        }
        assert!(orbit.interpolate_position(125.0)[0].is_nan());
        assert_eq!(orbit.time_span(), (0.0, 120.0));
        assert!(orbit.contains_time(120.0));
        assert!(!orbit.contains_time(-0.5));
    }

    #[test]
    fn test_display_table() {
        let orbit = circular_orbit(3, 10.0);
        let text = orbit.to_string();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().nth(1).unwrap().trim_start().starts_with("0.0000"));
    }
}
