use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where a piece of metadata can come from. The order in which sources are
/// listed in a run is their priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    /// Tags embedded in the media file
    Exif,
    /// Google Takeout style `.json` sidecar next to the media file
    #[serde(alias = "sidecar")]
    Json,
    /// Date pattern in the file name
    Filename,
}

impl MetadataSource {
    pub const ALL: [MetadataSource; 3] = [
        MetadataSource::Exif,
        MetadataSource::Json,
        MetadataSource::Filename,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataSource::Exif => "exif",
            MetadataSource::Json => "json",
            MetadataSource::Filename => "filename",
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exif" => Ok(MetadataSource::Exif),
            "json" | "sidecar" => Ok(MetadataSource::Json),
            "filename" => Ok(MetadataSource::Filename),
            other => Err(ConfigError::UnknownSource(other.to_string())),
        }
    }
}

/// Parse a comma-separated source list such as `exif,json,filename`.
pub fn parse_source_list(list: &str) -> Result<Vec<MetadataSource>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(MetadataSource::from_str)
        .collect()
}

/// Reject empty and repeated source lists.
pub fn validate_sources(sources: &[MetadataSource]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::NoSources);
    }
    for (i, source) in sources.iter().enumerate() {
        if sources[..i].contains(source) {
            return Err(ConfigError::DuplicateSource(*source));
        }
    }
    Ok(())
}
