#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::Path;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};

/// SOI + EOI: a JPEG with no EXIF block.
pub const BARE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

/// Minimal JPEG whose APP1 segment carries `DateTimeOriginal`.
pub fn jpeg_with_date(date: &str) -> Vec<u8> {
    let field = Field {
        tag: Tag::DateTimeOriginal,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![date.as_bytes().to_vec()]),
    };
    let mut writer = Writer::new();
    writer.push_field(&field);
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    let tiff = tiff.into_inner();

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

pub fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// Epoch seconds of a naive local time, the way the tool interprets it.
pub fn local_epoch(dt: NaiveDateTime) -> i64 {
    Local.from_local_datetime(&dt).earliest().unwrap().timestamp()
}

pub fn mtime(path: &Path) -> i64 {
    let meta = fs::metadata(path).unwrap();
    filetime::FileTime::from_last_modification_time(&meta).unix_seconds()
}

pub fn sidecar_json(epoch: i64, latitude: f64, longitude: f64) -> String {
    format!(
        r#"{{
  "title": "photo",
  "photoTakenTime": {{ "timestamp": "{epoch}", "formatted": "" }},
  "geoData": {{ "latitude": {latitude}, "longitude": {longitude}, "altitude": 0.0 }}
}}"#
    )
}
