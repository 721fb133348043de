use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{Exif, In, Reader, Tag, Value};

use crate::metadata::{Location, PartialMetadata};

const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Read capture date and GPS position from the file's EXIF block.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn extract_exif(path: &Path) -> PartialMetadata {
    if !is_image(path) {
        log::debug!("{}: not an image, EXIF skipped", path.display());
        return PartialMetadata::default();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::debug!("{}: cannot open for EXIF: {e}", path.display());
            return PartialMetadata::default();
        }
    };
    extract_from_reader(&mut BufReader::new(file)).unwrap_or_else(|e| {
        log::debug!("{}: no EXIF: {e}", path.display());
        PartialMetadata::default()
    })
}

/// Whether `path` already carries an EXIF block this reader understands.
pub(crate) fn has_exif_block(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .is_ok()
}

/// Same as [`extract_exif`] for an in-memory container.
pub fn extract_exif_bytes(bytes: &[u8]) -> PartialMetadata {
    extract_from_reader(&mut Cursor::new(bytes)).unwrap_or_default()
}

fn extract_from_reader<R: BufRead + Seek>(reader: &mut R) -> Result<PartialMetadata, exif::Error> {
    let exif = Reader::new().read_from_container(reader)?;
    Ok(PartialMetadata {
        timestamp: exif_date(&exif),
        location: exif_location(&exif),
    })
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .map_or(false, |mime| mime.type_() == mime_guess::mime::IMAGE)
}

fn exif_date(exif: &Exif) -> Option<NaiveDateTime> {
    DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        parse_exif_datetime(&field.display_value().to_string())
    })
}

pub(crate) fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');

    // Some writers store milliseconds since the epoch instead of a date string
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 = s.parse().ok()?;
        let utc = DateTime::from_timestamp_millis(millis)?;
        return Some(utc.with_timezone(&Local).naive_local());
    }

    let cleaned = s
        .replace('-', ":")
        .replace('/', ":")
        .replace('\\', ":")
        .replace('.', ":");

    if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }

    let date = NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d").ok()?;
    date.and_hms_opt(0, 0, 0)
}

fn exif_location(exif: &Exif) -> Option<Location> {
    let latitude = gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')?;
    let longitude = gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')?;
    Some(Location::new(latitude, longitude))
}

/// Degrees/minutes/seconds to signed decimal degrees.
fn gps_coordinate(exif: &Exif, coord_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let coord = exif.get_field(coord_tag, In::PRIMARY)?;
    let degrees = match &coord.value {
        Value::Rational(r) if r.len() >= 3 => {
            r[0].to_f64() + r[1].to_f64() / 60.0 + r[2].to_f64() / 3600.0
        }
        _ => return None,
    };
    if !degrees.is_finite() {
        return None;
    }

    let hemisphere = exif
        .get_field(ref_tag, In::PRIMARY)
        .map(|f| f.display_value().to_string())
        .unwrap_or_default();
    if hemisphere.contains(negative) {
        Some(-degrees)
    } else {
        Some(degrees)
    }
}
