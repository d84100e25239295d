use crate::video_probe::ProbeError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateSource {
    ImageExif,
    HeicExif,
    DngExif,
    VideoProbe,
    FallbackModified,
    FallbackEarliest,
    FallbackNow,
}

impl DateSource {
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            Self::FallbackModified | Self::FallbackEarliest | Self::FallbackNow
        )
    }
}

/// Non-fatal problem met while reading embedded metadata.
#[derive(Debug, Error)]
pub enum ExtractWarning {
    #[error("ファイルを開けませんでした: {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("EXIFを解析できませんでした: {path}: {source}")]
    Exif {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },
    #[error("HEICのデコードに対応していません: {path}")]
    HeicUnsupported { path: PathBuf },
    #[error("動画メタデータを取得できませんでした: {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },
}

/// Outcome of a single extractor. Never an error: a failure is an absent
/// date plus a warning the caller may surface.
#[derive(Debug, Default)]
pub struct Extraction {
    pub date: Option<NaiveDateTime>,
    pub warning: Option<ExtractWarning>,
}

impl Extraction {
    pub fn found(date: NaiveDateTime) -> Self {
        Self {
            date: Some(date),
            warning: None,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn warned(warning: ExtractWarning) -> Self {
        Self {
            date: None,
            warning: Some(warning),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDateTime,
    pub source: DateSource,
    pub warning: Option<String>,
}

impl ResolvedDate {
    /// Calendar-day key, `YYYY-MM-DD`, read from the clock value as-is.
    pub fn day_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}
