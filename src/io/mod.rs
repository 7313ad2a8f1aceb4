//! Scene metadata readers and writers

pub mod geodat_text;
pub mod geojson;
pub mod metadata;

pub use geodat_text::{parse_geodat_text, write_geodat_text, GeodatWriter};
pub use geojson::parse_geojson;
pub use metadata::{MetadataRecord, MetadataValue};

use crate::core::scene::SceneGeometry;
use crate::types::{GeoError, GeoResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for reading scene metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Read the `.in` text even when a `.geojson` sidecar exists
    pub force_text: bool,
}

/// Geodat metadata reader
pub struct GeodatReader;

impl GeodatReader {
    /// Read a scene from a geodat `.in` or `.geojson` file.
    ///
    /// Unless `force_text` is set, a sibling `.geojson` (the path with `.in`
    /// replaced) takes precedence over the text file.
    pub fn read_file<P: AsRef<Path>>(path: P, options: ReadOptions) -> GeoResult<SceneGeometry> {
        let path = path.as_ref();
        let record = if Self::is_geojson(path) {
            Self::read_geojson(path)?
        } else {
            match Self::geojson_sibling(path).filter(|p| !options.force_text && p.exists()) {
                Some(sidecar) => {
                    log::warn!(
                        "Substituting {} for {}",
                        sidecar.display(),
                        path.display()
                    );
                    Self::read_geojson(&sidecar)?
                }
                None => Self::read_text(path)?,
            }
        };
        SceneGeometry::from_record(&record)
    }

    fn is_geojson(path: &Path) -> bool {
        path.extension().map_or(false, |ext| ext == "geojson")
    }

    fn geojson_sibling(path: &Path) -> Option<PathBuf> {
        let name = path.to_str()?;
        if !name.contains(".in") {
            return None;
        }
        Some(PathBuf::from(name.replace(".in", ".geojson")))
    }

    fn read_contents(path: &Path) -> GeoResult<String> {
        fs::read_to_string(path).map_err(|e| {
            GeoError::MalformedMetadata(format!("cannot read {}: {}", path.display(), e))
        })
    }

    fn read_text(path: &Path) -> GeoResult<MetadataRecord> {
        log::info!("Reading geodat file: {}", path.display());
        parse_geodat_text(&Self::read_contents(path)?)
    }

    fn read_geojson(path: &Path) -> GeoResult<MetadataRecord> {
        log::info!("Reading geodat geojson: {}", path.display());
        parse_geojson(&Self::read_contents(path)?)
    }
}
