use approx::assert_relative_eq;
use geodat::io::{parse_geodat_text, parse_geojson, write_geodat_text};
use geodat::types::{GeoError, LookDirection, PassDirection};
use geodat::{GeodatReader, GeodatWriter, ReadOptions, SceneGeometry};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn geodat_text(time: &str) -> String {
    format!(
        "\
; Image name: synthetic
; Image date: 05 MAR 2020
; Image time: {time}
; Skew offset (s), squint (deg) : 0.5 -0.25
;
; rangesize,azimuthsize,nrangelooks,nazimuthlooks
;
100  200  2  4
;
; ReMajor, ReMinor, Rc, phic, h
;
6378.137 6356.752 850.5 34.0 693.5
;
; ll,lr,ul,ur
;
70.0 -50.0
70.1 -49.0
71.0 -50.5
71.1 -49.5
70.5 -49.7
;
; Range/azimuth single look pixel sizes
;
2.5  14.0
;
descending
;
; Look direction
;
right
;
state
; time after squint and skew corrections
{time}
; prf
1000.0
; wavelength
0.0555
; number of state vectors
2
; time of first vector
43500.0
; state vector interval
10.0
; state vectors
7.0e6 0.0 0.0
0.0 7500.0 0.0
7.0e6 75000.0 0.0
0.0 7500.0 0.0
"
    )
}

fn geodat_json(prf: f64) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[70.0, -50.0], [71.0, -50.5], [71.1, -49.5], [70.1, -49.0], [70.0, -50.0]]]
        },
        "properties": {
            "SkewOffset": 0.5,
            "Squint": -0.25,
            "MLRangeSize": 100,
            "MLAzimuthSize": 200,
            "NumberRangeLooks": 2,
            "NumberAzimuthLooks": 4,
            "EarthRadiusMajor": 6378137.0,
            "EarthRadiusMinor": 6356752.0,
            "MLCenterRange": 850500.0,
            "MLIncidenceCenter": 34.0,
            "SpaceCraftAltitude": 693500.0,
            "PRF": prf,
            "Wavelength": 0.0555,
            "SLCRangePixelSize": 2.5,
            "SLCAzimuthPixelSize": 14.0,
            "PassType": "DESCENDING",
            "LookDirection": "Right",
            "NumberOfStateVectors": 2,
            "Date": "2020-03-05",
            "CorrectedTime": "12 05 07.250000",
            "CenterLatLon": [70.5, -49.7],
            "TimeOfFirstStateVector": 43500.0,
            "StateVectorInterval": 10.0,
            "SV_Pos_1": [7.0e6, 0.0, 0.0],
            "SV_Vel_1": [0.0, 7500.0, 0.0],
            "SV_Pos_2": [7.0e6, 75000.0, 0.0],
            "SV_Vel_2": [0.0, 7500.0, 0.0]
        }
    })
}

fn scene_from_text(text: &str) -> SceneGeometry {
    SceneGeometry::from_record(&parse_geodat_text(text).unwrap()).unwrap()
}

#[test]
fn test_text_scene_fields() {
    let scene = scene_from_text(&geodat_text("12 05 07.250000"));
    let m = scene.metadata();

    assert_eq!(scene.t0(), 43507.25);
    assert_relative_eq!(scene.t1(), 43507.25 + 199.0 * 4.0 / 1000.0, epsilon = 1e-9);
    assert_eq!(scene.single_look_size(), (200, 800));
    assert_eq!(m.corners[4], [70.5, -49.7]);
    assert_eq!(m.skew, 0.5);
    assert_eq!(m.squint, -0.25);
    assert_eq!(m.pass, Some(PassDirection::Descending));
    assert_eq!(m.look, Some(LookDirection::Right));
    assert!(scene.is_descending().unwrap());
    assert_eq!(scene.orbit().len(), 2);
    assert_eq!(scene.date().to_string(), "2020-03-05");

    // Half swath = 99 * 2 * 2.5 / 2
    assert_relative_eq!(scene.near_range_m(), 850_500.0 - 247.5, epsilon = 1e-6);
    assert_relative_eq!(scene.far_range_m(), 850_500.0 + 247.5, epsilon = 1e-6);
    assert_relative_eq!(scene.near_range_single_look_m(), 850_500.0 - 247.5 - 1.25, epsilon = 1e-6);
}

#[test]
fn test_json_and_text_agree() {
    let from_text = scene_from_text(&geodat_text("12 05 07.250000"));
    let record = parse_geojson(&geodat_json(1000.0).to_string()).unwrap();
    let from_json = SceneGeometry::from_record(&record).unwrap();

    assert_eq!(from_json.metadata(), from_text.metadata());
    assert_eq!(from_json.orbit(), from_text.orbit());
    assert_eq!(from_json, from_text);
}

#[test]
fn test_writer_round_trip() {
    let text = geodat_text("12 05 07.250000")
        .replace("850.5 34.0 693.5", "850.5 34.0 693.5 1.25")
        + "deltaT 0.004\n";
    let scene = scene_from_text(&text);
    assert_eq!(scene.metadata().delta_r, Some(1.25));
    assert_eq!(scene.metadata().delta_t, Some(0.004));

    let mut buffer = Vec::new();
    write_geodat_text(&scene, &mut buffer).unwrap();
    let written = String::from_utf8(buffer).unwrap();

    assert!(written.contains("; Image date: 05 MAR 2020"));
    assert!(written.contains("7.000000000e+06 7.500000000e+04 0.000000000e+00"));
    assert!(written.contains("; Skew offset (s), squint (deg) : 0.5 -0.25"));
    assert!(written.contains("Descending Pass"));

    let reread = scene_from_text(&written);
    assert_eq!(reread, scene);
}

#[test]
fn test_reader_prefers_geojson_sidecar() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = TempDir::new().unwrap();
    let text_path = dir.path().join("geodat10x2.in");
    let json_path = dir.path().join("geodat10x2.geojson");
    fs::write(&text_path, geodat_text("12 05 07.250000")).unwrap();

    let text_only = GeodatReader::read_file(&text_path, ReadOptions::default()).unwrap();
    assert_eq!(text_only.prf(), 1000.0);

    fs::write(&json_path, geodat_json(1250.0).to_string()).unwrap();

    let substituted = GeodatReader::read_file(&text_path, ReadOptions::default()).unwrap();
    assert_eq!(substituted.prf(), 1250.0);

    let forced = GeodatReader::read_file(&text_path, ReadOptions { force_text: true }).unwrap();
    assert_eq!(forced.prf(), 1000.0);

    let direct = GeodatReader::read_file(&json_path, ReadOptions { force_text: true }).unwrap();
    assert_eq!(direct, substituted);
}

#[test]
fn test_writer_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("copy.in");
    let scene = scene_from_text(&geodat_text("12 05 07.250000"));

    GeodatWriter::write_file(&scene, &path).unwrap();
    let reread = GeodatReader::read_file(&path, ReadOptions::default()).unwrap();
    assert_eq!(reread, scene);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = GeodatReader::read_file(dir.path().join("absent.in"), ReadOptions::default());
    assert!(matches!(result, Err(GeoError::MalformedMetadata(_))));
}

#[test]
fn test_midnight_rollover_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rollover.in");
    fs::write(&path, geodat_text("24 00 01.000000")).unwrap();

    let result = GeodatReader::read_file(&path, ReadOptions::default());
    assert!(matches!(result, Err(GeoError::MidnightRollover { hour: 24 })));
}

#[test]
fn test_incomplete_metadata() {
    let text = geodat_text("12 05 07.250000").replace("2.5  14.0\n", "");
    let record = parse_geodat_text(&text).unwrap();
    assert!(matches!(
        SceneGeometry::from_record(&record),
        Err(GeoError::MalformedMetadata(_))
    ));

    let mut doc = geodat_json(1000.0);
    doc["properties"]["NumberOfStateVectors"] = json!(3);
    assert!(matches!(
        parse_geojson(&doc.to_string()),
        Err(GeoError::MalformedMetadata(_))
    ));

    assert!(matches!(parse_geojson("{not json"), Err(GeoError::Json(_))));
}

#[test]
fn test_unresolvable_state_interval() {
    let mut doc = geodat_json(1000.0);
    doc["properties"]["StateVectorInterval"] = json!(5e-324);
    let record = parse_geojson(&doc.to_string()).unwrap();
    assert!(matches!(
        SceneGeometry::from_record(&record),
        Err(GeoError::InvalidOrbit(_))
    ));
}

#[test]
fn test_writer_requires_directions() {
    let mut doc = geodat_json(1000.0);
    let props = doc["properties"].as_object_mut().unwrap();
    props.remove("PassType");
    props.remove("LookDirection");
    let scene = SceneGeometry::from_record(&parse_geojson(&doc.to_string()).unwrap()).unwrap();

    assert!(scene.metadata().pass.is_none());
    let mut buffer = Vec::new();
    assert!(matches!(
        write_geodat_text(&scene, &mut buffer),
        Err(GeoError::PreconditionViolation(_))
    ));
}
