//! Format-neutral key/value view of scene metadata.
//!
//! Both the positional `.in` parser and the keyed JSON sidecar fill a
//! [`MetadataRecord`]; a single translation step then builds the scene from it.
//! Keys are the internal attribute names below. Lengths are in kilometers for
//! the ellipsoid axes, center range and altitude, as in the text format.

use crate::types::{GeoError, GeoResult, Vec3};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const KEY_DATE: &str = "date";
pub const KEY_TIME: &str = "time";
pub const KEY_NR: &str = "nr";
pub const KEY_NA: &str = "na";
pub const KEY_NLR: &str = "nlr";
pub const KEY_NLA: &str = "nla";
pub const KEY_RE_MAJOR: &str = "re_major";
pub const KEY_RE_MINOR: &str = "re_minor";
pub const KEY_RC: &str = "rc";
pub const KEY_PHIC: &str = "phic";
pub const KEY_H: &str = "h";
pub const KEY_DELTA_R: &str = "delta_r";
pub const KEY_DELTA_T: &str = "delta_t";
pub const KEY_SKEW: &str = "skew";
pub const KEY_SQUINT: &str = "squint";
pub const KEY_CORNERS: &str = "corners";
pub const KEY_SLP_RG: &str = "slp_rg";
pub const KEY_SLP_AZ: &str = "slp_az";
pub const KEY_PASS: &str = "pass";
pub const KEY_LOOK: &str = "look";
pub const KEY_PRF: &str = "prf";
pub const KEY_WAVELENGTH: &str = "wavelength";
pub const KEY_N_STATE: &str = "n_state";
pub const KEY_T_STATE: &str = "t_state";
pub const KEY_DT_STATE: &str = "dt_state";
pub const KEY_POSITIONS: &str = "positions";
pub const KEY_VELOCITIES: &str = "velocities";

/// A single parsed metadata value
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    /// (lat, lon) pairs
    Pairs(Vec<[f64; 2]>),
    Triples(Vec<Vec3>),
}

/// Intermediate key -> value mapping shared by both metadata formats
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    fields: BTreeMap<String, MetadataValue>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: MetadataValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn required(&self, key: &str) -> GeoResult<&MetadataValue> {
        self.fields
            .get(key)
            .ok_or_else(|| GeoError::MalformedMetadata(format!("missing field '{}'", key)))
    }

    fn wrong_type(key: &str, expected: &str) -> GeoError {
        GeoError::MalformedMetadata(format!("field '{}' is not {}", key, expected))
    }

    pub fn number(&self, key: &str) -> GeoResult<f64> {
        match self.required(key)? {
            MetadataValue::Number(v) => Ok(*v),
            _ => Err(Self::wrong_type(key, "a number")),
        }
    }

    pub fn optional_number(&self, key: &str) -> GeoResult<Option<f64>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(MetadataValue::Number(v)) => Ok(Some(*v)),
            Some(_) => Err(Self::wrong_type(key, "a number")),
        }
    }

    /// Non-negative whole number
    pub fn count(&self, key: &str) -> GeoResult<usize> {
        let value = self.number(key)?;
        if value < 0.0 || value.fract() != 0.0 || !value.is_finite() {
            return Err(GeoError::MalformedMetadata(format!(
                "field '{}' must be a non-negative integer, got {}",
                key, value
            )));
        }
        Ok(value as usize)
    }

    pub fn text(&self, key: &str) -> GeoResult<&str> {
        match self.required(key)? {
            MetadataValue::Text(s) => Ok(s.as_str()),
            _ => Err(Self::wrong_type(key, "text")),
        }
    }

    pub fn optional_text(&self, key: &str) -> GeoResult<Option<&str>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(MetadataValue::Text(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(Self::wrong_type(key, "text")),
        }
    }

    pub fn date(&self, key: &str) -> GeoResult<NaiveDate> {
        match self.required(key)? {
            MetadataValue::Date(d) => Ok(*d),
            _ => Err(Self::wrong_type(key, "a date")),
        }
    }

    pub fn pairs(&self, key: &str) -> GeoResult<&[[f64; 2]]> {
        match self.required(key)? {
            MetadataValue::Pairs(p) => Ok(p.as_slice()),
            _ => Err(Self::wrong_type(key, "a list of pairs")),
        }
    }

    pub fn triples(&self, key: &str) -> GeoResult<&[Vec3]> {
        match self.required(key)? {
            MetadataValue::Triples(t) => Ok(t.as_slice()),
            _ => Err(Self::wrong_type(key, "a list of 3-vectors")),
        }
    }
}
