use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use unicode_normalization::UnicodeNormalization;

use crate::error::SidecarError;
use crate::metadata::{Location, PartialMetadata};

/// Takeout truncates sidecar file names to this many characters.
const MAX_SIDECAR_NAME_LEN: usize = 51;

static BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\d+\)\.").unwrap());

/// Localized "edited" suffixes (lowercase). Edited copies share the
/// original's sidecar.
const EDITED_SUFFIXES: &[&str] = &[
    "-edited",      // EN
    "-effects",     // EN
    "-smile",       // EN
    "-mix",         // EN
    "-edytowane",   // PL
    "-bearbeitet",  // DE
    "-bewerkt",     // NL
    "-編集済み",     // JA
    "-modificato",  // IT
    "-modifié",     // FR
    "-ha editado",  // ES
    "-editat",      // CA
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    photo_taken_time: Option<TimeField>,
    creation_time: Option<TimeField>,
    geo_data: Option<GeoData>,
    geo_data_exif: Option<GeoData>,
}

#[derive(Debug, Deserialize)]
struct TimeField {
    #[serde(deserialize_with = "epoch_seconds")]
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
struct GeoData {
    latitude: f64,
    longitude: f64,
}

/// Takeout writes the epoch as a string; accept plain numbers as well.
fn epoch_seconds<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Epoch {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Epoch::deserialize(d)? {
        Epoch::Int(v) => Ok(v),
        Epoch::Float(v) => Ok(v.trunc() as i64),
        Epoch::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Sidecar {
    fn timestamp(&self) -> Option<NaiveDateTime> {
        let epoch = self
            .photo_taken_time
            .as_ref()
            .or(self.creation_time.as_ref())?
            .timestamp;
        // Convert UTC epoch to local naive datetime
        let utc = DateTime::from_timestamp(epoch, 0)?;
        Some(utc.with_timezone(&Local).naive_local())
    }

    fn location(&self) -> Option<Location> {
        [&self.geo_data, &self.geo_data_exif]
            .into_iter()
            .flatten()
            .map(|g| Location::new(g.latitude, g.longitude))
            .find(|loc| !loc.is_null_island())
    }
}

/// Read a known sidecar file. Problems are logged and yield an empty record.
pub fn extract_sidecar(path: &Path) -> PartialMetadata {
    match read_sidecar(path) {
        Ok(partial) => {
            if partial.is_empty() {
                log::debug!("{}: sidecar carries no date or location", path.display());
            }
            partial
        }
        Err(e) => {
            log::warn!("{e}");
            PartialMetadata::default()
        }
    }
}

/// Parse a sidecar, surfacing read and schema errors.
pub fn read_sidecar(path: &Path) -> Result<PartialMetadata, SidecarError> {
    let bytes = fs::read(path).map_err(|source| SidecarError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sidecar(&bytes).map_err(|source| SidecarError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_sidecar(bytes: &[u8]) -> Result<PartialMetadata, serde_json::Error> {
    let sidecar: Sidecar = serde_json::from_slice(bytes)?;
    Ok(PartialMetadata {
        timestamp: sidecar.timestamp(),
        location: sidecar.location(),
    })
}

/// First existing sidecar candidate next to `media_path`.
pub fn find_sidecar(media_path: &Path) -> Option<PathBuf> {
    let dir = media_path.parent()?;
    let filename = media_path.file_name()?.to_str()?;

    sidecar_candidates(filename)
        .into_iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Sidecar file names to try for `filename`, most specific first.
pub fn sidecar_candidates(filename: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !out.contains(&name) {
            out.push(name);
        }
    };

    push(format!("{filename}.json"));
    push(format!("{}.json", shorten_name(filename)));
    push(format!("{}.json", bracket_swap(filename)));
    if let Some(original) = remove_edited_suffix(filename) {
        push(format!("{original}.json"));
    }
    if let Some(stem) = Path::new(filename).file_stem().and_then(|s| s.to_str()) {
        push(format!("{stem}.json"));
    }
    out
}

/// Takeout cuts `<name>.json` down to its file name length limit.
fn shorten_name(filename: &str) -> String {
    let max_len = MAX_SIDECAR_NAME_LEN - ".json".len();
    if filename.len() <= max_len {
        return filename.to_string();
    }
    let mut end = max_len;
    while end > 0 && !filename.is_char_boundary(end) {
        end -= 1;
    }
    filename[..end].to_string()
}

/// `image(1).jpg` has its sidecar at `image.jpg(1).json`.
fn bracket_swap(filename: &str) -> String {
    let Some(m) = BRACKET_RE.find_iter(filename).last() else {
        return filename.to_string();
    };
    let bracket = &filename[m.start()..m.end() - 1];
    let mut result = String::with_capacity(filename.len());
    result.push_str(&filename[..m.start()]);
    result.push_str(&filename[m.end() - 1..]);
    result.push_str(bracket);
    result
}

/// `photo-edited.jpg` -> `photo.jpg`, or `None` if there is no such suffix.
fn remove_edited_suffix(filename: &str) -> Option<String> {
    let normalized: String = filename.nfc().collect();
    let path = Path::new(&normalized);
    let stem = path.file_stem()?.to_str()?;
    let lower = stem.to_lowercase();

    let suffix = EDITED_SUFFIXES.iter().find(|s| lower.ends_with(*s))?;
    // Lowercasing can change byte lengths; cut by character count instead.
    let keep = stem.chars().count() - suffix.chars().count();
    let base: String = stem.chars().take(keep).collect();

    Some(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    })
}
