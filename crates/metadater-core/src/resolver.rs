use crate::extract::{extractor_for, DateParser, Extractor};
use crate::media::MediaFile;
use crate::metadata::ResolvedMetadata;
use crate::source::MetadataSource;

/// Queries extractors in priority order and merges their findings.
pub struct MetadataResolver {
    extractors: Vec<Box<dyn Extractor>>,
}

impl MetadataResolver {
    /// One extractor per source, in the given order.
    pub fn new(sources: &[MetadataSource], parser: &DateParser) -> Self {
        Self {
            extractors: sources.iter().map(|s| extractor_for(*s, parser)).collect(),
        }
    }

    pub fn from_extractors(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    pub fn sources(&self) -> Vec<MetadataSource> {
        self.extractors.iter().map(|e| e.source()).collect()
    }

    /// Fold every extractor's result into one record. A field, once set, is
    /// never replaced by a later source; querying stops when both are set.
    pub fn resolve(&self, file: &MediaFile) -> ResolvedMetadata {
        let mut resolved = ResolvedMetadata::default();
        for extractor in &self.extractors {
            if resolved.is_complete() {
                break;
            }
            let partial = extractor.extract(file);
            if partial.is_empty() {
                log::debug!("{}: nothing from {}", file.path.display(), extractor.source());
                continue;
            }
            resolved.merge_missing_from(partial, extractor.source());
        }
        resolved
    }
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("sources", &self.sources())
            .finish()
    }
}

/// Resolve a single file without keeping a resolver around.
pub fn resolve(
    file: &MediaFile,
    sources: &[MetadataSource],
    parser: &DateParser,
) -> ResolvedMetadata {
    MetadataResolver::new(sources, parser).resolve(file)
}
