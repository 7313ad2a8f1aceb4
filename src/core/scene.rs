use crate::core::earth::{EarthModel, GeodeticTransform, Wgs84};
use crate::core::geocoding::{GeocodingSolver, RadarTiming};
use crate::core::orbit::OrbitModel;
use crate::io::metadata::*;
use crate::types::{
    GeoError, GeoResult, GeocodeResult, GroundPoint, LookDirection, PassDirection,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Scene description as read from a geodat file.
///
/// Lengths follow the file convention: ellipsoid axes, center range and
/// altitude in kilometers, pixel sizes in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Midnight of the acquisition day
    pub date: NaiveDate,
    /// Corrected (post squint/skew) acquisition start
    pub acquisition: NaiveDateTime,
    pub prf: f64,
    pub wavelength: f64,
    pub nr: usize,
    pub na: usize,
    pub nlr: usize,
    pub nla: usize,
    pub slp_rg: f64,
    pub slp_az: f64,
    pub re_major_km: f64,
    pub re_minor_km: f64,
    pub rc_km: f64,
    pub phic_deg: f64,
    pub h_km: f64,
    /// Range error correction, when supplied
    pub delta_r: Option<f64>,
    pub delta_t: Option<f64>,
    pub skew: f64,
    pub squint: f64,
    /// ll, lr, ul, ur, center as (lat, lon) degrees
    pub corners: [[f64; 2]; 5],
    pub pass: Option<PassDirection>,
    pub look: Option<LookDirection>,
}

/// Scene geometry: metadata, orbit and earth model behind one entry point.
///
/// Read-only after construction apart from the memoized near/far ranges and the
/// orbit interpolator cache, all of which are initialized at most once.
#[derive(Debug)]
pub struct SceneGeometry {
    metadata: SceneMetadata,
    orbit: OrbitModel,
    earth: EarthModel,
    t0: f64,
    t1: f64,
    near_range: OnceLock<f64>,
    far_range: OnceLock<f64>,
}

impl SceneGeometry {
    /// Validate metadata and bind it to its orbit
    pub fn new(metadata: SceneMetadata, orbit: OrbitModel) -> GeoResult<Self> {
        let malformed = |msg: String| Err(GeoError::MalformedMetadata(msg));

        if metadata.nr < 1 || metadata.na < 1 || metadata.nlr < 1 || metadata.nla < 1 {
            return malformed(format!(
                "sizes and looks must be at least 1 (nr={}, na={}, nlr={}, nla={})",
                metadata.nr, metadata.na, metadata.nlr, metadata.nla
            ));
        }
        if !(metadata.slp_rg > 0.0 && metadata.slp_az > 0.0) {
            return malformed(format!(
                "single-look pixel sizes must be positive ({}, {})",
                metadata.slp_rg, metadata.slp_az
            ));
        }
        if !(metadata.prf > 0.0) {
            return malformed(format!("prf must be positive, got {}", metadata.prf));
        }

        let earth = EarthModel::new(metadata.re_major_km * 1000.0, metadata.re_minor_km * 1000.0)?;

        if metadata.acquisition.date() != metadata.date {
            return malformed(format!(
                "acquisition {} does not fall on {}",
                metadata.acquisition, metadata.date
            ));
        }
        let time = metadata.acquisition.time();
        let micros = time.num_seconds_from_midnight() as u64 * 1_000_000
            + (time.nanosecond() / 1000) as u64;
        let t0 = micros as f64 / 1e6;
        let t1 = t0 + (metadata.na - 1) as f64 * metadata.nla as f64 / metadata.prf;

        log::debug!(
            "Scene {}: t0={:.6} t1={:.6} ({} state vectors)",
            metadata.acquisition,
            t0,
            t1,
            orbit.len()
        );

        Ok(Self {
            metadata,
            orbit,
            earth,
            t0,
            t1,
            near_range: OnceLock::new(),
            far_range: OnceLock::new(),
        })
    }

    /// Translate a parsed record into a scene
    pub fn from_record(record: &MetadataRecord) -> GeoResult<Self> {
        let date = record.date(KEY_DATE)?;
        let time = parse_time_of_day(record.text(KEY_TIME)?)?;

        let corners_list = record.pairs(KEY_CORNERS)?;
        let corners: [[f64; 2]; 5] = corners_list.try_into().map_err(|_| {
            GeoError::MalformedMetadata(format!(
                "expected 5 corner points, got {}",
                corners_list.len()
            ))
        })?;

        let pass = match record.optional_text(KEY_PASS)? {
            Some(s) => Some(PassDirection::parse(s).ok_or_else(|| {
                GeoError::MalformedMetadata(format!("invalid pass direction '{}'", s))
            })?),
            None => None,
        };
        let look = match record.optional_text(KEY_LOOK)? {
            Some(s) => Some(LookDirection::parse(s).ok_or_else(|| {
                GeoError::MalformedMetadata(format!("invalid look direction '{}'", s))
            })?),
            None => None,
        };

        let metadata = SceneMetadata {
            date,
            acquisition: date.and_time(time),
            prf: record.number(KEY_PRF)?,
            wavelength: record.number(KEY_WAVELENGTH)?,
            nr: record.count(KEY_NR)?,
            na: record.count(KEY_NA)?,
            nlr: record.count(KEY_NLR)?,
            nla: record.count(KEY_NLA)?,
            slp_rg: record.number(KEY_SLP_RG)?,
            slp_az: record.number(KEY_SLP_AZ)?,
            re_major_km: record.number(KEY_RE_MAJOR)?,
            re_minor_km: record.number(KEY_RE_MINOR)?,
            rc_km: record.number(KEY_RC)?,
            phic_deg: record.number(KEY_PHIC)?,
            h_km: record.number(KEY_H)?,
            delta_r: record.optional_number(KEY_DELTA_R)?,
            delta_t: record.optional_number(KEY_DELTA_T)?,
            skew: record.optional_number(KEY_SKEW)?.unwrap_or(0.0),
            squint: record.optional_number(KEY_SQUINT)?.unwrap_or(0.0),
            corners,
            pass,
            look,
        };

        let n_state = record.count(KEY_N_STATE)?;
        let positions = record.triples(KEY_POSITIONS)?;
        let velocities = record.triples(KEY_VELOCITIES)?;
        if positions.len() != n_state || velocities.len() != n_state {
            return Err(GeoError::MalformedMetadata(format!(
                "expected {} state vectors, found {} positions and {} velocities",
                n_state,
                positions.len(),
                velocities.len()
            )));
        }
        let orbit = OrbitModel::new(
            record.number(KEY_T_STATE)?,
            record.number(KEY_DT_STATE)?,
            positions.to_vec(),
            velocities.to_vec(),
        )?;

        Self::new(metadata, orbit)
    }

    pub fn metadata(&self) -> &SceneMetadata {
        &self.metadata
    }

    pub fn orbit(&self) -> &OrbitModel {
        &self.orbit
    }

    pub fn earth(&self) -> &EarthModel {
        &self.earth
    }

    pub fn date(&self) -> NaiveDate {
        self.metadata.date
    }

    pub fn acquisition_datetime(&self) -> NaiveDateTime {
        self.metadata.acquisition
    }

    /// Scene start, seconds after midnight
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Scene end, `t0 + (na - 1) * nla / prf`
    pub fn t1(&self) -> f64 {
        self.t1
    }

    pub fn prf(&self) -> f64 {
        self.metadata.prf
    }

    pub fn wavelength(&self) -> f64 {
        self.metadata.wavelength
    }

    pub fn single_look_resolution(&self) -> (f64, f64) {
        (self.metadata.slp_rg, self.metadata.slp_az)
    }

    pub fn single_look_size(&self) -> (usize, usize) {
        (
            self.metadata.nr * self.metadata.nlr,
            self.metadata.na * self.metadata.nla,
        )
    }

    pub fn center_range_m(&self) -> f64 {
        self.metadata.rc_km * 1000.0
    }

    pub fn satellite_altitude_m(&self) -> f64 {
        self.metadata.h_km * 1000.0
    }

    fn half_swath_m(&self) -> f64 {
        (self.metadata.nr - 1) as f64 * self.metadata.nlr as f64 * self.metadata.slp_rg * 0.5
    }

    pub fn near_range_m(&self) -> f64 {
        *self
            .near_range
            .get_or_init(|| self.center_range_m() - self.half_swath_m())
    }

    pub fn far_range_m(&self) -> f64 {
        *self
            .far_range
            .get_or_init(|| self.center_range_m() + self.half_swath_m())
    }

    /// Range of the first single-look sample, the origin of geocoded range pixels
    pub fn near_range_single_look_m(&self) -> f64 {
        self.center_range_m()
            - self.half_swath_m()
            - (self.metadata.nlr - 1) as f64 * self.metadata.slp_rg / 2.0
    }

    pub fn time_in_scene(&self, t: f64) -> bool {
        t >= self.t0 && t <= self.t1
    }

    pub fn range_in_scene(&self, range: f64) -> bool {
        range >= self.near_range_m() && range <= self.far_range_m()
    }

    pub fn result_in_scene(&self, result: &GeocodeResult) -> bool {
        self.time_in_scene(result.azimuth_time) && self.range_in_scene(result.slant_range)
    }

    /// Earth radius at the scene-center latitude
    pub fn earth_radius_at_center_m(&self) -> f64 {
        self.earth
            .radius_at_latitude(self.metadata.corners[4][0].to_radians())
    }

    /// Satellite distance from the earth's center at `t`
    pub fn satellite_radius_at(&self, t: f64) -> f64 {
        self.orbit.geocentric_distance(t)
    }

    /// Nominal center angle from altitude, center range and a circular orbit
    pub fn incidence_angle_at_center_nominal(&self) -> f64 {
        let alt = self.satellite_altitude_m();
        let r1 = self.center_range_m();
        let re = self.earth_radius_at_center_m();
        let cos_theta = (r1 * r1 + 2.0 * alt * re + alt * alt) / (2.0 * r1 * (re + alt));
        cos_theta.acos()
    }

    /// Angle for a time/range inside the scene using the actual orbit radius.
    ///
    /// `z` raises the center earth radius. `None` when outside the scene.
    pub fn incidence_angle_at(&self, t: f64, range: f64, z: f64) -> Option<f64> {
        if !self.time_in_scene(t) || !self.range_in_scene(range) {
            return None;
        }
        Some(law_of_cosines_angle(
            range,
            self.satellite_radius_at(t),
            self.earth_radius_at_center_m() + z,
        ))
    }

    /// Center angle from the orbit-consistent geocoding of the scene center point
    pub fn incidence_angle_at_center_actual(&self) -> Option<f64> {
        let [lat, lon] = self.metadata.corners[4];
        let result = self.geocode(lat, lon, 0.0, None);
        if !result.converged {
            log::warn!("Scene center ({}, {}) did not geocode; no actual incidence angle", lat, lon);
            return None;
        }
        Some(law_of_cosines_angle(
            result.slant_range,
            self.satellite_radius_at(result.azimuth_time),
            self.earth_radius_at_center_m(),
        ))
    }

    pub fn pass_direction(&self) -> GeoResult<PassDirection> {
        self.metadata.pass.ok_or_else(|| {
            GeoError::PreconditionViolation("no pass direction recorded".to_string())
        })
    }

    pub fn look_direction(&self) -> GeoResult<LookDirection> {
        self.metadata.look.ok_or_else(|| {
            GeoError::PreconditionViolation("no look direction recorded".to_string())
        })
    }

    pub fn is_ascending(&self) -> GeoResult<bool> {
        Ok(self.pass_direction()? == PassDirection::Ascending)
    }

    pub fn is_descending(&self) -> GeoResult<bool> {
        Ok(self.pass_direction()? == PassDirection::Descending)
    }

    pub fn is_right_looking(&self) -> GeoResult<bool> {
        Ok(self.look_direction()? == LookDirection::Right)
    }

    /// True when the first corner lies south of the equator
    pub fn is_south_hemisphere(&self) -> bool {
        self.metadata.corners[0][0] < 0.0
    }

    /// Default Newton seed, `t0 + 0.5 * na * nla / prf`
    pub fn default_seed_time(&self) -> f64 {
        self.t0 + 0.5 * self.metadata.na as f64 * self.metadata.nla as f64 / self.metadata.prf
    }

    pub fn radar_timing(&self) -> RadarTiming {
        RadarTiming {
            t0: self.t0,
            prf: self.metadata.prf,
            near_range_single_look: self.near_range_single_look_m(),
            slp_rg: self.metadata.slp_rg,
            default_seed: self.default_seed_time(),
        }
    }

    pub fn solver(&self) -> GeocodingSolver<'_> {
        GeocodingSolver::new(&self.orbit, self.radar_timing())
    }

    /// Geocode latitude/longitude (degrees) and elevation (m) through WGS84
    pub fn geocode(&self, lat: f64, lon: f64, z: f64, seed: Option<f64>) -> GeocodeResult {
        self.geocode_with(&Wgs84, &GroundPoint::new(lat, lon, z), seed)
    }

    pub fn geocode_with<T: GeodeticTransform + ?Sized>(
        &self,
        transform: &T,
        point: &GroundPoint,
        seed: Option<f64>,
    ) -> GeocodeResult {
        self.solver().solve_geodetic(transform, point, seed)
    }
}

impl PartialEq for SceneGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.orbit == other.orbit
    }
}

impl Clone for SceneGeometry {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            orbit: self.orbit.clone(),
            earth: self.earth,
            t0: self.t0,
            t1: self.t1,
            near_range: OnceLock::new(),
            far_range: OnceLock::new(),
        }
    }
}

fn law_of_cosines_angle(range: f64, sat_radius: f64, target_radius: f64) -> f64 {
    ((range * range + sat_radius * sat_radius - target_radius * target_radius)
        / (2.0 * sat_radius * range))
        .acos()
}

/// Parse an "HH MM SS.ffffff" time of day.
///
/// Hours past 23 come from squint/skew corrections crossing midnight and are
/// rejected rather than rolled over to the next day.
pub fn parse_time_of_day(value: &str) -> GeoResult<NaiveTime> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(GeoError::MalformedMetadata(format!(
            "time of day '{}' must have hour, minute and second",
            value
        )));
    }
    let bad = |_| GeoError::MalformedMetadata(format!("invalid time of day '{}'", value));
    let hour: u32 = tokens[0].parse().map_err(bad)?;
    let minute: u32 = tokens[1].parse().map_err(bad)?;
    let seconds: f64 = tokens[2]
        .parse()
        .map_err(|_| GeoError::MalformedMetadata(format!("invalid seconds in '{}'", value)))?;

    if hour > 23 {
        return Err(GeoError::MidnightRollover { hour });
    }
    if !(0.0..60.0).contains(&seconds) {
        return Err(GeoError::MalformedMetadata(format!("invalid seconds in '{}'", value)));
    }

    let whole = seconds.trunc();
    let micro = ((seconds - whole) * 1e6) as u32;
    NaiveTime::from_hms_micro_opt(hour, minute, whole as u32, micro)
        .ok_or_else(|| GeoError::MalformedMetadata(format!("invalid time of day '{}'", value)))
}

/// Format a time of day the way geodat files store it
pub fn format_time_of_day(time: &NaiveTime) -> String {
    format!(
        "{:02} {:02} {:02}.{:06}",
        time.hour(),
        time.minute(),
        time.second(),
        time.nanosecond() / 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_of_day() {
        let t = parse_time_of_day("12 05 07.250000").unwrap();
        assert_eq!((t.hour(), t.minute(), t.second()), (12, 5, 7));
        assert_eq!(t.nanosecond(), 250_000_000);
        assert_eq!(format_time_of_day(&t), "12 05 07.250000");
    }

    #[test]
    fn test_midnight_rollover_is_fatal() {
        let err = parse_time_of_day("24 00 01.5").unwrap_err();
        assert!(matches!(err, GeoError::MidnightRollover { hour: 24 }));
        assert!(parse_time_of_day("12 05").is_err());
        assert!(parse_time_of_day("12 xx 01.0").is_err());
    }
}
