use std::path::{Path, PathBuf};

use crate::extract::sidecar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Absolute (or caller-relative) path of the input file
    pub path: PathBuf,
    /// Path below the input root, mirrored under the output root
    pub relative: PathBuf,
    /// Paired JSON sidecar, if one was found
    pub sidecar: Option<PathBuf>,
}

impl MediaFile {
    /// Describe `path` and look up its sidecar.
    pub fn new(path: PathBuf, relative: PathBuf) -> Self {
        let sidecar = sidecar::find_sidecar(&path);
        Self {
            path,
            relative,
            sidecar,
        }
    }

    /// Build a descriptor for a lone file, mirrored by its file name.
    pub fn from_path(path: &Path) -> Self {
        let relative = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
        Self::new(path.to_path_buf(), relative)
    }

    /// Just the filename
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }
}
