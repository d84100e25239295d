use crate::media::MediaFile;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A subtree entry the recursive walk could not read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnreadableEntry {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct MediaTree {
    pub directories: Vec<PathBuf>,
    pub unreadable: Vec<UnreadableEntry>,
}

/// Media files under `root` in natural name order (`IMG_2` before `IMG_10`).
/// Listing order doubles as the tie-break for files with identical capture
/// times. Unreadable entries below `root` are logged and skipped when
/// walking recursively.
pub fn discover(root: &Path, recursive: bool) -> Result<Vec<MediaFile>> {
    if recursive {
        let (files, _) = walk_media(root);
        return Ok(files);
    }

    let mut out = Vec::new();
    let listing = fs::read_dir(root)
        .with_context(|| format!("フォルダを読めませんでした: {}", root.display()))?;
    for entry in listing {
        let entry = entry.with_context(|| format!("エントリ読み取り失敗: {}", root.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(file) = MediaFile::from_path(path) {
            out.push(file);
        }
    }
    out.sort_by(|a, b| compare_names(&a.file_name(), &b.file_name()));
    Ok(out)
}

/// Every directory in the subtree that directly contains at least one media
/// file, in path order, plus whatever the walk could not read.
pub fn directories_with_media(root: &Path) -> MediaTree {
    let (files, unreadable) = walk_media(root);
    let directories: BTreeSet<PathBuf> = files
        .into_iter()
        .filter_map(|file| file.path.parent().map(Path::to_path_buf))
        .collect();
    MediaTree {
        directories: directories.into_iter().collect(),
        unreadable,
    }
}

fn walk_media(root: &Path) -> (Vec<MediaFile>, Vec<UnreadableEntry>) {
    let mut files = Vec::new();
    let mut unreadable = Vec::new();

    let walker = WalkDir::new(root).sort_by(|a, b| {
        compare_names(&a.file_name().to_string_lossy(), &b.file_name().to_string_lossy())
    });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                warn!(path = %path.display(), "フォルダ走査に失敗しました: {err}");
                unreadable.push(UnreadableEntry {
                    path,
                    error: err.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(file) = MediaFile::from_path(entry.into_path()) {
            files.push(file);
        }
    }

    (files, unreadable)
}

/// Compares runs of ASCII digits by value and everything else as text.
pub(crate) fn compare_names(a: &str, b: &str) -> Ordering {
    let (left, right) = (chunks(a), chunks(b));
    for (x, y) in left.iter().zip(&right) {
        let ord = if is_digits(x) && is_digits(y) {
            let (x, y) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        } else {
            x.cmp(y)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

fn chunks(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=bytes.len() {
        if i == bytes.len() || bytes[i].is_ascii_digit() != bytes[start].is_ascii_digit() {
            out.push(&name[start..i]);
            start = i;
        }
    }
    out
}

fn is_digits(chunk: &str) -> bool {
    chunk.bytes().next().is_some_and(|b| b.is_ascii_digit())
}
