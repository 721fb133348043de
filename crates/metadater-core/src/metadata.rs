use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::source::MetadataSource;

/// Signed decimal degrees. South and West are negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Takeout writes `0.0, 0.0` when it has no location.
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// What a single extractor found. Empty means nothing usable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialMetadata {
    pub timestamp: Option<NaiveDateTime>,
    pub location: Option<Location>,
}

impl PartialMetadata {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.location.is_none()
    }
}

/// Per-file record merged from all configured sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    pub capture_timestamp: Option<NaiveDateTime>,
    pub location: Option<Location>,
    /// Source that supplied `capture_timestamp`
    pub timestamp_source: Option<MetadataSource>,
    /// Source that supplied `location`
    pub location_source: Option<MetadataSource>,
}

impl ResolvedMetadata {
    /// Fill each unset field from `partial`. Fields that are already set are
    /// never overwritten.
    pub fn merge_missing_from(&mut self, partial: PartialMetadata, source: MetadataSource) {
        if self.capture_timestamp.is_none() {
            if let Some(ts) = partial.timestamp {
                self.capture_timestamp = Some(ts);
                self.timestamp_source = Some(source);
            }
        }
        if self.location.is_none() {
            if let Some(loc) = partial.location {
                self.location = Some(loc);
                self.location_source = Some(source);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.capture_timestamp.is_some() && self.location.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.capture_timestamp.is_none() && self.location.is_none()
    }

    /// True when some field came from outside the file's own EXIF block and
    /// so is worth embedding into the output.
    pub fn has_foreign_fields(&self) -> bool {
        let foreign = |source: Option<MetadataSource>| {
            source.is_some_and(|s| s != MetadataSource::Exif)
        };
        foreign(self.timestamp_source) || foreign(self.location_source)
    }
}
