//! Keyed JSON sidecar (`geodat*.geojson`).
//!
//! Property names are mapped onto internal attribute names through a fixed
//! table. Ellipsoid axes, center range and altitude arrive in meters and are
//! converted to kilometers to match the text format.

use crate::io::metadata::*;
use crate::types::{GeoError, GeoResult, Vec3};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Scalar properties: (internal name, JSON property, required)
pub const PROPERTY_TABLE: [(&str, &str, bool); 19] = [
    (KEY_SKEW, "SkewOffset", false),
    (KEY_SQUINT, "Squint", false),
    (KEY_NR, "MLRangeSize", true),
    (KEY_NA, "MLAzimuthSize", true),
    (KEY_NLR, "NumberRangeLooks", true),
    (KEY_NLA, "NumberAzimuthLooks", true),
    (KEY_RE_MAJOR, "EarthRadiusMajor", true),
    (KEY_RE_MINOR, "EarthRadiusMinor", true),
    (KEY_RC, "MLCenterRange", true),
    (KEY_PHIC, "MLIncidenceCenter", true),
    (KEY_H, "SpaceCraftAltitude", true),
    (KEY_DELTA_R, "RangeErrorCorrection", false),
    (KEY_PRF, "PRF", true),
    (KEY_WAVELENGTH, "Wavelength", true),
    (KEY_SLP_RG, "SLCRangePixelSize", true),
    (KEY_SLP_AZ, "SLCAzimuthPixelSize", true),
    (KEY_PASS, "PassType", false),
    (KEY_LOOK, "LookDirection", false),
    (KEY_N_STATE, "NumberOfStateVectors", true),
];

/// Properties delivered in meters and stored in kilometers
const METER_KEYS: [&str; 4] = [KEY_RE_MAJOR, KEY_RE_MINOR, KEY_RC, KEY_H];

/// Polygon vertex order -> corner slot (ll, lr, ul, ur)
const CORNER_ORDER: [usize; 4] = [0, 3, 1, 2];

fn malformed(msg: impl Into<String>) -> GeoError {
    GeoError::MalformedMetadata(msg.into())
}

fn as_f64(value: &Value, name: &str) -> GeoResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| malformed(format!("property '{}' is not a number", name)))
}

fn as_vector<const N: usize>(value: &Value, name: &str) -> GeoResult<[f64; N]> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed(format!("property '{}' is not an array", name)))?;
    if items.len() != N {
        return Err(malformed(format!(
            "property '{}' has {} components, expected {}",
            name,
            items.len(),
            N
        )));
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = as_f64(item, name)?;
    }
    Ok(out)
}

fn property<'a>(props: &'a Map<String, Value>, name: &str) -> GeoResult<&'a Value> {
    props
        .get(name)
        .ok_or_else(|| malformed(format!("missing property '{}'", name)))
}

/// Parse a geodat GeoJSON document into the intermediate record
pub fn parse_geojson(content: &str) -> GeoResult<MetadataRecord> {
    let document: Value = serde_json::from_str(content)?;
    parse_geojson_value(&document)
}

pub fn parse_geojson_value(document: &Value) -> GeoResult<MetadataRecord> {
    let props = document
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing 'properties' object"))?;
    let ring = document
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(|c| c.get(0))
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing geometry coordinates"))?;

    let mut record = MetadataRecord::new();

    for (key, name, required) in PROPERTY_TABLE.iter() {
        let value = match props.get(*name) {
            Some(v) => v,
            None if *required => return Err(malformed(format!("missing property '{}'", name))),
            None => continue,
        };
        let parsed = match value {
            Value::String(s) => MetadataValue::Text(s.to_lowercase()),
            _ => {
                let number = as_f64(value, name)?;
                if METER_KEYS.contains(key) {
                    MetadataValue::Number(number / 1000.0)
                } else {
                    MetadataValue::Number(number)
                }
            }
        };
        record.insert(key, parsed);
    }

    let date_text = property(props, "Date")?
        .as_str()
        .ok_or_else(|| malformed("property 'Date' is not a string"))?;
    let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
        .map_err(|e| malformed(format!("bad Date '{}': {}", date_text, e)))?;
    record.insert(KEY_DATE, MetadataValue::Date(date));

    let time_text = property(props, "CorrectedTime")?
        .as_str()
        .ok_or_else(|| malformed("property 'CorrectedTime' is not a string"))?;
    record.insert(KEY_TIME, MetadataValue::Text(time_text.to_string()));

    if ring.len() < 4 {
        return Err(malformed(format!("footprint has {} vertices, need 4", ring.len())));
    }
    let mut corners: Vec<[f64; 2]> = CORNER_ORDER
        .iter()
        .map(|&i| as_vector::<2>(&ring[i], "coordinates"))
        .collect::<GeoResult<_>>()?;
    corners.push(as_vector::<2>(property(props, "CenterLatLon")?, "CenterLatLon")?);
    record.insert(KEY_CORNERS, MetadataValue::Pairs(corners));

    record.insert(
        KEY_T_STATE,
        MetadataValue::Number(as_f64(property(props, "TimeOfFirstStateVector")?, "TimeOfFirstStateVector")?),
    );
    record.insert(
        KEY_DT_STATE,
        MetadataValue::Number(as_f64(property(props, "StateVectorInterval")?, "StateVectorInterval")?),
    );

    let n_state = record.count(KEY_N_STATE)?;
    let mut positions: Vec<Vec3> = Vec::with_capacity(n_state);
    let mut velocities: Vec<Vec3> = Vec::with_capacity(n_state);
    for i in 1..=n_state {
        let pos_name = format!("SV_Pos_{}", i);
        let vel_name = format!("SV_Vel_{}", i);
        positions.push(as_vector::<3>(property(props, &pos_name)?, &pos_name)?);
        velocities.push(as_vector::<3>(property(props, &vel_name)?, &vel_name)?);
    }
    record.insert(KEY_POSITIONS, MetadataValue::Triples(positions));
    record.insert(KEY_VELOCITIES, MetadataValue::Triples(velocities));

    log::debug!("Parsed {} geojson fields", record.len());
    Ok(record)
}
