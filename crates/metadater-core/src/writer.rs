use std::cell::Cell;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::NaiveDateTime;
use img_parts::png::Png;
use img_parts::ImageEXIF;
use little_exif::exif_tag::ExifTag;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use little_exif::rational::uR64;

use crate::error::{EmbedError, WriteError};
use crate::media::MediaFile;
use crate::metadata::{Location, ResolvedMetadata};

/// Extensions little_exif can write EXIF into.
const EXIF_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "heic", "heif", "jxl"];

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

// little_exif's JPEG encoding: FF E1, 2-byte length, "Exif\0\0", then TIFF.
const APP1_HEADER_SIZE: usize = 10;

/// A file that made it to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// Resolved metadata was embedded as EXIF tags
    pub exif_embedded: bool,
}

/// Copy `file` into `destination_dir` (mirroring its relative path) and apply
/// the resolved metadata to the copy.
pub fn write(
    file: &MediaFile,
    metadata: &ResolvedMetadata,
    destination_dir: &Path,
) -> Result<WrittenFile, WriteError> {
    let dest = destination_dir.join(&file.relative);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| WriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Read fully first: source and destination may be the same file.
    let original = fs::read(&file.path).map_err(|source| WriteError::Read {
        path: file.path.clone(),
        source,
    })?;
    write_bytes(&dest, &original)?;

    let mut exif_embedded = false;
    if metadata.has_foreign_fields() {
        match embed_exif(&dest, metadata) {
            Ok(()) => exif_embedded = true,
            Err(EmbedError::UnsupportedOutputFormat(ext)) => {
                log::debug!(
                    "{}: .{ext} cannot carry EXIF, setting file time only",
                    dest.display()
                );
            }
            Err(e) => {
                log::warn!("{}: {e}; keeping the untouched copy", dest.display());
                write_bytes(&dest, &original)?;
            }
        }
    }

    if let Some(ts) = metadata.capture_timestamp {
        set_file_times(&dest, ts)?;
    }

    Ok(WrittenFile {
        path: dest,
        exif_embedded,
    })
}

fn write_bytes(dest: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    fs::write(dest, bytes).map_err(|source| WriteError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

/// Whether little_exif can write into files with this extension.
pub fn supports_exif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| EXIF_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

/// Write capture time and GPS position into the EXIF block of `path`,
/// keeping any tags already present.
pub fn embed_exif(path: &Path, metadata: &ResolvedMetadata) -> Result<(), EmbedError> {
    if !supports_exif(path) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        return Err(EmbedError::UnsupportedOutputFormat(ext));
    }

    let has_exif = crate::extract::exif::has_exif_block(path);
    let mut exif = if has_exif {
        quietly(|| Metadata::new_from_path(path))
            .and_then(Result::ok)
            .unwrap_or_else(Metadata::new)
    } else {
        Metadata::new()
    };

    if let Some(ts) = metadata.capture_timestamp {
        let value = ts.format(EXIF_DATETIME_FORMAT).to_string();
        exif.set_tag(ExifTag::DateTimeOriginal(value.clone()));
        exif.set_tag(ExifTag::CreateDate(value.clone()));
        exif.set_tag(ExifTag::ModifyDate(value));
    }
    if let Some(loc) = metadata.location {
        set_gps_coordinates(&mut exif, loc);
    }

    // little_exif falls back to a zTXt text chunk for PNGs without an eXIf
    // chunk, which EXIF readers ignore.
    if is_png(path) && !has_exif {
        return write_png_exif(&exif, path);
    }

    match quietly(|| exif.write_to_file(path)) {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(EmbedError::Exif(e.to_string())),
        None => Err(EmbedError::Exif("little_exif panicked".to_string())),
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Store the encoded EXIF block in a PNG `eXIf` chunk.
fn write_png_exif(exif: &Metadata, path: &Path) -> Result<(), EmbedError> {
    let app1 = quietly(|| exif.as_u8_vec(FileExtension::JPEG))
        .ok_or_else(|| EmbedError::Exif("little_exif panicked".to_string()))?
        .map_err(|e| EmbedError::Exif(format!("cannot encode EXIF: {e:?}")))?;
    if app1.len() <= APP1_HEADER_SIZE || &app1[4..APP1_HEADER_SIZE] != b"Exif\0\0" {
        return Err(EmbedError::Exif("unexpected EXIF encoding".to_string()));
    }
    let tiff = app1[APP1_HEADER_SIZE..].to_vec();

    let bytes = fs::read(path).map_err(|e| EmbedError::Exif(e.to_string()))?;
    let mut png = Png::from_bytes(bytes.into())
        .map_err(|e| EmbedError::Exif(format!("cannot parse PNG: {e}")))?;
    png.set_exif(Some(tiff.into()));

    let mut out = Vec::new();
    png.encoder()
        .write_to(&mut out)
        .map_err(|e| EmbedError::Exif(format!("cannot encode PNG: {e}")))?;
    fs::write(path, out).map_err(|e| EmbedError::Exif(e.to_string()))
}

thread_local! {
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Run `f`, turning a little_exif panic into `None` without printing it.
///
/// The silencing hook is installed once and only mutes panics raised on the
/// calling thread while `f` runs; everything else reaches the previous hook.
fn quietly<T>(f: impl FnOnce() -> T) -> Option<T> {
    QUIET_HOOK.call_once(|| {
        let prev_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !QUIET.with(Cell::get) {
                prev_hook(info);
            }
        }));
    });

    QUIET.with(|q| q.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    QUIET.with(|q| q.set(false));
    result.ok()
}

fn set_gps_coordinates(exif: &mut Metadata, loc: Location) {
    let lat_ref = if loc.latitude >= 0.0 { "N" } else { "S" };
    exif.set_tag(ExifTag::GPSLatitudeRef(lat_ref.to_string()));
    exif.set_tag(ExifTag::GPSLatitude(decimal_to_dms(loc.latitude.abs())));

    let lon_ref = if loc.longitude >= 0.0 { "E" } else { "W" };
    exif.set_tag(ExifTag::GPSLongitudeRef(lon_ref.to_string()));
    exif.set_tag(ExifTag::GPSLongitude(decimal_to_dms(loc.longitude.abs())));
}

/// Decimal degrees to EXIF degrees/minutes/seconds rationals.
fn decimal_to_dms(decimal: f64) -> Vec<uR64> {
    let degrees = decimal.floor();
    let minutes_decimal = (decimal - degrees) * 60.0;
    let minutes = minutes_decimal.floor();
    let seconds = (minutes_decimal - minutes) * 60.0;

    vec![
        uR64 {
            nominator: degrees as u32,
            denominator: 1,
        },
        uR64 {
            nominator: minutes as u32,
            denominator: 1,
        },
        uR64 {
            nominator: (seconds * 1000.0).round() as u32,
            denominator: 1000,
        },
    ]
}

/// The timestamp is naive local time; convert back to an epoch for the
/// filesystem. Both access and modification time are set.
fn set_file_times(path: &Path, ts: NaiveDateTime) -> Result<(), WriteError> {
    let Some(local) = ts.and_local_timezone(chrono::Local).earliest() else {
        log::warn!("{}: {ts} does not exist in the local zone", path.display());
        return Ok(());
    };
    let ft = filetime::FileTime::from_unix_time(local.timestamp(), 0);
    filetime::set_file_times(path, ft, ft).map_err(|source| WriteError::Timestamp {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PartialMetadata;
    use crate::source::MetadataSource;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::tempdir;

    fn resolved_from(source: MetadataSource, ts: NaiveDateTime, loc: Option<Location>) -> ResolvedMetadata {
        let mut resolved = ResolvedMetadata::default();
        resolved.merge_missing_from(
            PartialMetadata {
                timestamp: Some(ts),
                location: loc,
            },
            source,
        );
        resolved
    }

    fn mtime(path: &Path) -> i64 {
        let meta = fs::metadata(path).unwrap();
        filetime::FileTime::from_last_modification_time(&meta).unix_seconds()
    }

    #[test]
    fn unsupported_format_gets_file_time_only() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let src = src_dir.path().join("clip.mp4");
        fs::write(&src, b"not really a video").unwrap();

        let ts = NaiveDate::from_ymd_opt(2020, 3, 4).unwrap().and_hms_opt(15, 10, 15).unwrap();
        let resolved = resolved_from(MetadataSource::Filename, ts, None);
        let written = write(&MediaFile::from_path(&src), &resolved, out_dir.path()).unwrap();

        assert_eq!(written.path, out_dir.path().join("clip.mp4"));
        assert!(!written.exif_embedded);
        assert_eq!(fs::read(&written.path).unwrap(), b"not really a video");
        let expected = chrono::Local.from_local_datetime(&ts).earliest().unwrap().timestamp();
        assert_eq!(mtime(&written.path), expected);
    }

    #[test]
    fn exif_only_record_is_copied_verbatim() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let src = src_dir.path().join("photo.jpg");
        fs::write(&src, b"\xFF\xD8 pretend jpeg \xFF\xD9").unwrap();

        let ts = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let resolved = resolved_from(MetadataSource::Exif, ts, None);
        let written = write(&MediaFile::from_path(&src), &resolved, out_dir.path()).unwrap();

        assert!(!written.exif_embedded);
        assert_eq!(fs::read(&written.path).unwrap(), fs::read(&src).unwrap());
    }

    #[test]
    fn no_metadata_leaves_copy_untouched() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let src = src_dir.path().join("notes.txt");
        fs::write(&src, b"hello").unwrap();

        let written = write(
            &MediaFile::from_path(&src),
            &ResolvedMetadata::default(),
            out_dir.path(),
        )
        .unwrap();
        assert_eq!(fs::read(written.path).unwrap(), b"hello");
    }

    #[test]
    fn missing_source_is_a_read_error() {
        let out_dir = tempdir().unwrap();
        let file = MediaFile::from_path(Path::new("/nonexistent/photo.jpg"));
        let err = write(&file, &ResolvedMetadata::default(), out_dir.path()).unwrap_err();
        assert!(matches!(err, WriteError::Read { .. }));
    }

    #[test]
    fn mirrors_relative_path() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        fs::create_dir(src_dir.path().join("2019")).unwrap();
        let src = src_dir.path().join("2019").join("a.png");
        fs::write(&src, b"png").unwrap();

        let file = MediaFile::new(src, PathBuf::from("2019/a.png"));
        let written = write(&file, &ResolvedMetadata::default(), out_dir.path()).unwrap();
        assert_eq!(written.path, out_dir.path().join("2019").join("a.png"));
        assert!(written.path.is_file());
    }

    /// 1x1 RGBA PNG without any metadata chunk.
    const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x64,
        0x60, 0xF8, 0x5F, 0x0F, 0x00, 0x02, 0x87, 0x01, 0x80, 0xEB, 0x47, 0xBA, 0x92, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    #[test]
    fn png_without_exif_reads_back() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let src = src_dir.path().join("IMG_20200304_151015.png");
        fs::write(&src, TINY_PNG).unwrap();

        let ts = NaiveDate::from_ymd_opt(2020, 3, 4).unwrap().and_hms_opt(15, 10, 15).unwrap();
        let resolved = resolved_from(MetadataSource::Json, ts, Some(Location::new(-33.8675, 151.2)));
        let written = write(&MediaFile::from_path(&src), &resolved, out_dir.path()).unwrap();
        assert!(written.exif_embedded);

        let bytes = fs::read(&written.path).unwrap();
        let png = Png::from_bytes(bytes.into()).unwrap();
        assert!(png.exif().is_some());

        let back = crate::extract::exif::extract_exif(&written.path);
        assert_eq!(back.timestamp, Some(ts));
        let loc = back.location.unwrap();
        assert!((loc.latitude - -33.8675).abs() < 1e-4);
        assert!((loc.longitude - 151.2).abs() < 1e-4);
    }

    #[test]
    fn panics_are_caught() {
        assert_eq!(quietly(|| 7), Some(7));
        assert_eq!(quietly(|| -> u8 { panic!("boom") }), None);
        // Flag is cleared again afterwards
        assert!(!QUIET.with(Cell::get));
    }

    #[test]
    fn dms_conversion() {
        let dms = decimal_to_dms(33.8675);
        assert_eq!(dms[0].nominator, 33);
        assert_eq!(dms[1].nominator, 52);
        assert_eq!((dms[2].nominator, dms[2].denominator), (3000, 1000));
    }

    #[test]
    fn exif_extension_check() {
        assert!(supports_exif(Path::new("a.JPG")));
        assert!(supports_exif(Path::new("b.heic")));
        assert!(!supports_exif(Path::new("c.mov")));
        assert!(!supports_exif(Path::new("noext")));
        assert!(matches!(
            embed_exif(Path::new("c.mov"), &ResolvedMetadata::default()),
            Err(EmbedError::UnsupportedOutputFormat(ext)) if ext == "mov"
        ));
    }
}
