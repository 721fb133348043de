pub mod cancel;
pub mod error;
pub mod extract;
pub mod media;
pub mod metadata;
pub mod resolver;
pub mod scan;
pub mod source;
pub mod writer;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use cancel::{CancellationToken, CancelledError};
pub use error::{ConfigError, EmbedError, Error, SidecarError, WriteError};
pub use extract::{DateParser, Extractor, FilenamePattern};
pub use media::MediaFile;
pub use metadata::{Location, PartialMetadata, ResolvedMetadata};
pub use resolver::{resolve, MetadataResolver};
pub use source::MetadataSource;

/// File name pattern used when none is configured.
pub const DEFAULT_FILENAME_PATTERN: &str = "IMG_%Y%m%d_%H%M%S";

fn default_sources() -> Vec<MetadataSource> {
    MetadataSource::ALL.to_vec()
}

fn default_patterns() -> Vec<String> {
    vec![DEFAULT_FILENAME_PATTERN.to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Metadata sources, highest priority first
    #[serde(default = "default_sources")]
    pub sources: Vec<MetadataSource>,
    /// strptime-style templates for the `filename` source
    #[serde(default = "default_patterns")]
    pub filename_patterns: Vec<String>,
    /// Descend into subdirectories and mirror them in the output
    #[serde(default)]
    pub recursive: bool,
}

impl ProcessOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            sources: default_sources(),
            filename_patterns: default_patterns(),
            recursive: false,
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Copied with a resolved date and/or location applied
    Written {
        input: PathBuf,
        output: PathBuf,
        metadata: ResolvedMetadata,
        exif_embedded: bool,
    },
    /// No source had anything; copied as-is
    Unchanged { input: PathBuf, output: PathBuf },
    /// Could not be written; the batch moved on
    Failed { input: PathBuf, reason: String },
}

impl FileOutcome {
    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Written { input, .. }
            | FileOutcome::Unchanged { input, .. }
            | FileOutcome::Failed { input, .. } => input,
        }
    }

    /// One line for the user: `name => date, location`.
    pub fn describe(&self) -> String {
        let name = self
            .input()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self {
            FileOutcome::Written { metadata, .. } => {
                let date = match (metadata.capture_timestamp, metadata.timestamp_source) {
                    (Some(ts), Some(src)) => format!("{} ({src})", ts.format("%Y-%m-%dT%H:%M:%S")),
                    _ => "no date".to_string(),
                };
                let location = match (metadata.location, metadata.location_source) {
                    (Some(loc), Some(src)) => format!("{loc} ({src})"),
                    _ => "no location".to_string(),
                };
                format!("{name} => {date}, {location}")
            }
            FileOutcome::Unchanged { .. } => {
                format!("{name} => no metadata found, left unchanged")
            }
            FileOutcome::Failed { reason, .. } => format!("{name} => error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessResult {
    pub total_files: u64,
    pub files_written: u64,
    pub files_unchanged: u64,
    pub files_failed: u64,
    pub outcomes: Vec<FileOutcome>,
}

/// Control options for process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Cancellation token, checked between files.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}

/// Type alias for progress callback: `(stage, current, total, message)`.
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Run the full pipeline with progress reporting.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback,
) -> Result<ProcessResult, Error> {
    process_with_control(options, &ProcessControl::default(), progress_callback)
}

/// Run the full pipeline with progress reporting and control options.
pub fn process_with_control(
    options: &ProcessOptions,
    control: &ProcessControl,
    progress_callback: &ProgressCallback,
) -> Result<ProcessResult, Error> {
    let (input, output, resolver) = prepare(options)?;
    log::debug!("source order: {:?}", resolver.sources());

    // Stage 1: Scan
    let media = scan::scan(&input, &output, options.recursive);
    let total = media.len() as u64;
    progress_callback("scan", 0, total, &format!("{total} media files"));

    // Stage 2: Resolve and write, one file at a time
    let mut result = ProcessResult {
        total_files: total,
        ..ProcessResult::default()
    };
    for (i, file) in media.iter().enumerate() {
        if let Some(ref token) = control.cancel_token {
            token.check()?;
        }

        let outcome = process_file(file, &resolver, &output);
        match &outcome {
            FileOutcome::Written { .. } => {
                result.files_written += 1;
                log::info!("{}", outcome.describe());
            }
            FileOutcome::Unchanged { .. } => {
                result.files_unchanged += 1;
                log::info!("{}", outcome.describe());
            }
            FileOutcome::Failed { .. } => {
                result.files_failed += 1;
                log::warn!("{}", outcome.describe());
            }
        }
        progress_callback("file", i as u64, total, &outcome.describe());
        result.outcomes.push(outcome);
    }

    Ok(result)
}

/// Resolve and write a single file.
pub fn process_file(file: &MediaFile, resolver: &MetadataResolver, output: &Path) -> FileOutcome {
    let metadata = resolver.resolve(file);
    match writer::write(file, &metadata, output) {
        Ok(written) if metadata.is_empty() => FileOutcome::Unchanged {
            input: file.path.clone(),
            output: written.path,
        },
        Ok(written) => FileOutcome::Written {
            input: file.path.clone(),
            output: written.path,
            metadata,
            exif_embedded: written.exif_embedded,
        },
        Err(e) => FileOutcome::Failed {
            input: file.path.clone(),
            reason: e.to_string(),
        },
    }
}

/// Check the options and set up the output directory. Nothing is written
/// unless every check passes.
pub fn prepare(options: &ProcessOptions) -> Result<(PathBuf, PathBuf, MetadataResolver), ConfigError> {
    source::validate_sources(&options.sources)?;

    // Patterns only matter (and are only checked) for the filename source
    let parser = if options.sources.contains(&MetadataSource::Filename) {
        let parser = DateParser::new(&options.filename_patterns)?;
        if parser.is_empty() {
            return Err(ConfigError::MissingFilenamePatterns);
        }
        parser
    } else {
        DateParser::default()
    };

    if !options.input.exists() {
        return Err(ConfigError::InputMissing(options.input.clone()));
    }
    if !options.input.is_dir() {
        return Err(ConfigError::InputNotDirectory(options.input.clone()));
    }
    if options.output.exists() && !options.output.is_dir() {
        return Err(ConfigError::OutputNotDirectory(options.output.clone()));
    }

    let create_err = |source: std::io::Error| ConfigError::CreateOutput {
        path: options.output.clone(),
        source,
    };
    fs::create_dir_all(&options.output).map_err(create_err)?;
    let output = options.output.canonicalize().map_err(create_err)?;
    let input = options
        .input
        .canonicalize()
        .map_err(|_| ConfigError::InputMissing(options.input.clone()))?;

    Ok((input, output, MetadataResolver::new(&options.sources, &parser)))
}
