pub mod exif;
pub mod filename;
pub mod sidecar;

use crate::media::MediaFile;
use crate::metadata::PartialMetadata;
use crate::source::MetadataSource;

pub use filename::{DateParser, FilenamePattern};

/// One metadata source. Implementations return an empty record when they
/// find nothing; they never fail.
pub trait Extractor: Send + Sync {
    fn source(&self) -> MetadataSource;
    fn extract(&self, file: &MediaFile) -> PartialMetadata;
}

/// Reads tags embedded in the media file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl Extractor for ExifExtractor {
    fn source(&self) -> MetadataSource {
        MetadataSource::Exif
    }

    fn extract(&self, file: &MediaFile) -> PartialMetadata {
        exif::extract_exif(&file.path)
    }
}

/// Reads the Takeout JSON sidecar paired with the media file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSidecarExtractor;

impl Extractor for JsonSidecarExtractor {
    fn source(&self) -> MetadataSource {
        MetadataSource::Json
    }

    fn extract(&self, file: &MediaFile) -> PartialMetadata {
        match &file.sidecar {
            Some(path) => sidecar::extract_sidecar(path),
            None => PartialMetadata::default(),
        }
    }
}

/// Parses the capture time out of the file name.
#[derive(Debug, Clone)]
pub struct FilenameExtractor {
    parser: DateParser,
}

impl FilenameExtractor {
    pub fn new(parser: DateParser) -> Self {
        Self { parser }
    }
}

impl Extractor for FilenameExtractor {
    fn source(&self) -> MetadataSource {
        MetadataSource::Filename
    }

    fn extract(&self, file: &MediaFile) -> PartialMetadata {
        PartialMetadata {
            timestamp: self.parser.parse(file.file_name()),
            location: None,
        }
    }
}

/// Build the extractor for `source`.
pub fn extractor_for(source: MetadataSource, parser: &DateParser) -> Box<dyn Extractor> {
    match source {
        MetadataSource::Exif => Box::new(ExifExtractor),
        MetadataSource::Json => Box::new(JsonSidecarExtractor),
        MetadataSource::Filename => Box::new(FilenameExtractor::new(parser.clone())),
    }
}
