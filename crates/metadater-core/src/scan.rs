use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::media::MediaFile;

/// Collect the media files below `input`, sorted by name.
///
/// Hidden entries and `.json` sidecars are skipped, as is `output` when it
/// lives inside `input`.
pub fn scan(input: &Path, output: &Path, recursive: bool) -> Vec<MediaFile> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut media = Vec::new();

    let walker = WalkDir::new(input)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || (!is_hidden(e) && e.path() != output));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || is_sidecar(path) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(input) else {
            continue;
        };
        media.push(MediaFile::new(path.to_path_buf(), relative.to_path_buf()));
    }

    log::info!("Found {} media files in {}", media.len(), input.display());
    media
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
