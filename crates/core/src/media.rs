use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "bmp"];
const DNG_EXTENSIONS: &[&str] = &["dng"];
const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "avi", "mkv", "m4v", "3gp", "wmv"];

/// Format family of a media file, derived from its extension alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaFormat {
    Image,
    Dng,
    Heic,
    Video,
}

impl MediaFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Self::Image)
        } else if DNG_EXTENSIONS.contains(&ext) {
            Some(Self::Dng)
        } else if HEIC_EXTENSIONS.contains(&ext) {
            Some(Self::Heic)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| Self::from_extension(&ext.to_string_lossy()))
    }

    pub fn kind_label(self) -> &'static str {
        match self {
            Self::Video => "Videos",
            Self::Image | Self::Dng | Self::Heic => "Photos",
        }
    }
}

pub fn is_media_file(path: &Path) -> bool {
    MediaFormat::from_path(path).is_some()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub format: MediaFormat,
    /// Lowercased, without the leading dot.
    pub extension: String,
}

impl MediaFile {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let format = MediaFormat::from_path(&path)?;
        let extension = path
            .extension()
            .map(|v| v.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Some(Self {
            path,
            format,
            extension,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Extension as it appears on disk, with the leading dot.
    pub fn original_extension(&self) -> String {
        self.path
            .extension()
            .map(|v| format!(".{}", v.to_string_lossy()))
            .unwrap_or_default()
    }
}
