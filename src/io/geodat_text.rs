//! Positional `geodat.in` text format.
//!
//! Field identity is inferred from line order and token count; lines containing
//! `;` are comments except for the image date and skew/squint headers. The
//! parser only fills a [`MetadataRecord`], it never builds scene state itself.

use crate::core::scene::{format_time_of_day, SceneGeometry};
use crate::io::metadata::*;
use crate::types::{GeoError, GeoResult, Vec3};
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

/// Tracks which positional fields have been consumed so far
#[derive(Default)]
struct PositionalState {
    sizes: bool,
    radii: bool,
    corners: Vec<[f64; 2]>,
    pixel_sizes: bool,
    pass: bool,
    look: bool,
    time: bool,
    prf: bool,
    wavelength: bool,
    n_state: Option<usize>,
    t_state: bool,
    dt_state: bool,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

fn parse_f64(token: &str, line_no: usize) -> GeoResult<f64> {
    token.parse::<f64>().map_err(|_| {
        GeoError::MalformedMetadata(format!("line {}: invalid number '{}'", line_no, token))
    })
}

fn parse_floats(tokens: &[&str], line_no: usize) -> GeoResult<Vec<f64>> {
    tokens.iter().map(|t| parse_f64(t, line_no)).collect()
}

/// `; Image date: 05 MAR 2020` header, compiled once per process
fn image_date_pattern() -> GeoResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r";\s*Image date\s*:\s*(.+?)\s*$"))
        .as_ref()
        .map_err(|e| GeoError::MalformedMetadata(format!("date pattern: {}", e)))
}

/// Parse geodat text into the intermediate record
pub fn parse_geodat_text(content: &str) -> GeoResult<MetadataRecord> {
    let date_re = image_date_pattern()?;

    let mut record = MetadataRecord::new();
    let mut state = PositionalState::default();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(caps) = date_re.captures(line) {
            let text = caps[1].to_string();
            let date = NaiveDate::parse_from_str(&text, "%d %b %Y").map_err(|e| {
                GeoError::MalformedMetadata(format!("line {}: bad image date '{}': {}", line_no, text, e))
            })?;
            record.insert(KEY_DATE, MetadataValue::Date(date));
            continue;
        }

        if line.contains("Skew") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() >= 9 {
                record.insert(KEY_SKEW, MetadataValue::Number(parse_f64(tokens[7], line_no)?));
                record.insert(KEY_SQUINT, MetadataValue::Number(parse_f64(tokens[8], line_no)?));
            }
            continue;
        }

        if line.contains(';') {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let keyword = tokens[0].to_lowercase();

        if keyword == "deltat" {
            if tokens.len() < 2 {
                return Err(GeoError::MalformedMetadata(format!("line {}: deltaT without value", line_no)));
            }
            record.insert(KEY_DELTA_T, MetadataValue::Number(parse_f64(tokens[1], line_no)?));
        } else if !state.sizes && tokens.len() == 4 {
            let v = parse_floats(&tokens, line_no)?;
            for (key, value) in [KEY_NR, KEY_NA, KEY_NLR, KEY_NLA].iter().zip(v) {
                record.insert(key, MetadataValue::Number(value));
            }
            state.sizes = true;
        } else if !state.radii && (tokens.len() == 5 || tokens.len() == 6) {
            let v = parse_floats(&tokens, line_no)?;
            let keys = [KEY_RE_MAJOR, KEY_RE_MINOR, KEY_RC, KEY_PHIC, KEY_H, KEY_DELTA_R];
            for (key, value) in keys.iter().zip(v) {
                record.insert(key, MetadataValue::Number(value));
            }
            state.radii = true;
        } else if state.corners.len() < 5 && tokens.len() == 2 {
            let v = parse_floats(&tokens, line_no)?;
            state.corners.push([v[0], v[1]]);
        } else if !state.pixel_sizes && tokens.len() == 2 {
            let v = parse_floats(&tokens, line_no)?;
            record.insert(KEY_SLP_RG, MetadataValue::Number(v[0]));
            record.insert(KEY_SLP_AZ, MetadataValue::Number(v[1]));
            state.pixel_sizes = true;
        } else if (keyword == "ascending" || keyword == "descending") && !state.pass {
            record.insert(KEY_PASS, MetadataValue::Text(keyword));
            state.pass = true;
        } else if (keyword == "right" || keyword == "left") && !state.look {
            record.insert(KEY_LOOK, MetadataValue::Text(keyword));
            state.look = true;
        } else if keyword == "state" {
            log::debug!("State vector block starts at line {}", line_no);
        } else if tokens.len() == 3 && !state.time {
            record.insert(KEY_TIME, MetadataValue::Text(tokens.join(" ")));
            state.time = true;
        } else if tokens.len() == 1 && !state.prf {
            record.insert(KEY_PRF, MetadataValue::Number(parse_f64(tokens[0], line_no)?));
            state.prf = true;
        } else if tokens.len() == 1 && !state.wavelength {
            record.insert(KEY_WAVELENGTH, MetadataValue::Number(parse_f64(tokens[0], line_no)?));
            state.wavelength = true;
        } else if tokens.len() == 1 && state.n_state.is_none() {
            let n = parse_f64(tokens[0], line_no)?;
            record.insert(KEY_N_STATE, MetadataValue::Number(n));
            state.n_state = Some(if n >= 0.0 { n as usize } else { 0 });
        } else if tokens.len() == 1 && !state.t_state {
            record.insert(KEY_T_STATE, MetadataValue::Number(parse_f64(tokens[0], line_no)?));
            state.t_state = true;
        } else if tokens.len() == 1 && !state.dt_state {
            record.insert(KEY_DT_STATE, MetadataValue::Number(parse_f64(tokens[0], line_no)?));
            state.dt_state = true;
        } else if tokens.len() == 3
            && state.velocities.len() < state.n_state.unwrap_or(0)
        {
            let v = parse_floats(&tokens, line_no)?;
            // Position and velocity triples alternate
            if state.positions.len() == state.velocities.len() {
                state.positions.push([v[0], v[1], v[2]]);
            } else {
                state.velocities.push([v[0], v[1], v[2]]);
            }
        } else {
            log::debug!("Ignoring unrecognized geodat line {}: '{}'", line_no, line.trim());
        }
    }

    if !state.corners.is_empty() {
        record.insert(KEY_CORNERS, MetadataValue::Pairs(state.corners));
    }
    if state.n_state.is_some() {
        record.insert(KEY_POSITIONS, MetadataValue::Triples(state.positions));
        record.insert(KEY_VELOCITIES, MetadataValue::Triples(state.velocities));
    }

    log::debug!("Parsed {} geodat fields", record.len());
    Ok(record)
}

/// Python-style scientific notation: `7.071000000e+06`
fn sci(value: f64) -> String {
    let formatted = format!("{:.9e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}

/// Write a scene in geodat text form.
///
/// Requires pass and look direction to be recorded.
pub fn write_geodat_text<W: Write>(scene: &SceneGeometry, out: &mut W) -> GeoResult<()> {
    let m = scene.metadata();
    let orbit = scene.orbit();
    let pass = scene.pass_direction()?;
    let look = scene.look_direction()?;
    let descending = scene.is_descending()?;
    let time = format_time_of_day(&m.acquisition.time());

    writeln!(out, "; Image name: ")?;
    writeln!(out, "; Image date: {}", m.date.format("%d %b %Y").to_string().to_uppercase())?;
    writeln!(out, "; Image time: {}", time)?;
    writeln!(out, "; Nominal center lat,lon: {:?} {:?}", m.corners[4][0], m.corners[4][1])?;
    writeln!(out, "; track direction: 0.000000")?;
    writeln!(out, "; S/C altitude: {:.6}", scene.satellite_altitude_m())?;
    writeln!(out, "; Average height above terrain: 0.000000")?;
    writeln!(out, "; Vel along track: 0.000000")?;
    writeln!(out, "; PRF :   {:?}", m.prf)?;
    writeln!(
        out,
        "; near/cen/far range : {:.3} {:.3} {:.3}",
        scene.near_range_m(),
        m.rc_km,
        scene.far_range_m()
    )?;
    writeln!(out, "; Range pixel spacing :  {:?}", m.nlr as f64 * m.slp_rg)?;
    writeln!(out, "; Number of looks (rg,az) :   {} {}", m.nlr, m.nla)?;
    writeln!(out, "; Azimuth pixel spacing :    {:?}", m.nla as f64 * m.slp_az)?;
    writeln!(out, "; Number of pixels (rg,az) :  {}  {}", m.nr, m.na)?;
    writeln!(out, "; Number of state vectors :   {}", orbit.len())?;
    writeln!(out, "; Start time of state vectors :   {:?}", orbit.t_state())?;
    writeln!(out, "; Interval between 2 state vectors :   {:?}", orbit.dt_state())?;
    writeln!(out, "; Look direction  :   {}", look.code())?;
    writeln!(out, "; Offset of first recordin complex image (s) : 0.000000")?;
    writeln!(out, "; Skew offset (s), squint (deg) : {:?} {:?}", m.skew, m.squint)?;

    let pass_banner = if descending { "Descending Pass" } else { "AscendingPass" };
    writeln!(out, ";\n; {} \n;\n; rangesize,azimuthsize,nrangelooks,nazimuthlooks\n;", pass_banner)?;
    writeln!(out, "{}  {}  {}  {}", m.nr, m.na, m.nlr, m.nla)?;
    writeln!(out, ";\n; ReMajor, ReMinor, Rc, phic, h\n;")?;
    write!(
        out,
        "{:.5} {:.5} {:.6} {:.5} {:.6}",
        m.re_major_km,
        m.re_minor_km,
        m.rc_km,
        m.phic_deg,
        scene.satellite_altitude_m() * 0.001
    )?;
    match m.delta_r {
        Some(delta_r) => writeln!(out, " {:?}", delta_r)?,
        None => writeln!(out)?,
    }
    writeln!(out, ";\n; ll,lr,ul,ur\n;")?;
    for corner in &m.corners {
        writeln!(out, "{:.10}  {:.10}", corner[0], corner[1])?;
    }
    writeln!(out, ";\n; Range/azimuth single look pixel sizes \n;")?;
    writeln!(out, "{:.7}  {:.7}", m.slp_rg, m.slp_az)?;
    writeln!(out, ";\n{}", pass)?;
    writeln!(out, ";\n; Look direction\n;\n{}", look)?;
    writeln!(out, ";\n; Flag to indicate state vectors and associated data\n;\nstate")?;
    writeln!(out, "; time after squint and skew corrections")?;
    writeln!(out, "{}", time)?;
    writeln!(out, "; prf \n{:?}", m.prf)?;
    writeln!(out, "; wavelength\n{:?}", m.wavelength)?;
    writeln!(out, "; number of state vectors\n{}", orbit.len())?;
    writeln!(out, "; time of first vector \n{:?}", orbit.t_state())?;
    writeln!(out, "; state vector interval \n{:?}", orbit.dt_state())?;
    writeln!(out, "; state vectors ")?;
    for sv in orbit.state_vectors() {
        writeln!(out, "{} {} {}", sci(sv.position[0]), sci(sv.position[1]), sci(sv.position[2]))?;
        writeln!(out, "{} {} {}", sci(sv.velocity[0]), sci(sv.velocity[1]), sci(sv.velocity[2]))?;
    }
    if let Some(delta_t) = m.delta_t {
        writeln!(out, "deltaT {:?}", delta_t)?;
    }
    Ok(())
}

/// File-level geodat text writer
pub struct GeodatWriter;

impl GeodatWriter {
    pub fn write_file<P: AsRef<Path>>(scene: &SceneGeometry, path: P) -> GeoResult<()> {
        log::info!("Writing geodat file: {}", path.as_ref().display());
        let mut buffer = Vec::new();
        write_geodat_text(scene, &mut buffer)?;
        fs::write(&path, buffer)?;
        Ok(())
    }
}
