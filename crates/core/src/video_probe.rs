use crate::metadata::{ExtractWarning, Extraction};
use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const FORMAT_DATE_FIELDS: &[&str] = &[
    "creation_time",
    "date",
    "creation_date",
    "com.apple.quicktime.creationdate",
];
const STREAM_DATE_FIELDS: &[&str] = &["creation_time", "date"];

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{program} を起動できませんでした: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{}秒以内に応答がありませんでした", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },
    #[error("異常終了しました ({status}): {stderr}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("出力のJSONを解析できませんでした: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("プロセスとの入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),
}

/// Container and stream tags as reported by the probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeDocument {
    #[serde(default)]
    pub format: Option<ProbeSection>,
    #[serde(default)]
    pub streams: Vec<ProbeSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeSection {
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl ProbeDocument {
    pub fn from_json(raw: &[u8]) -> Result<Self, ProbeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Container tags first, in field priority order, then each stream.
    /// Stream tags only count in their ISO-8601 form.
    pub fn capture_date(&self) -> Option<NaiveDateTime> {
        let from_format = self.format.as_ref().and_then(|format| {
            FORMAT_DATE_FIELDS.iter().find_map(|field| {
                format
                    .tags
                    .get(*field)
                    .and_then(|raw| parse_video_datetime(raw))
            })
        });

        from_format.or_else(|| {
            self.streams.iter().find_map(|stream| {
                STREAM_DATE_FIELDS.iter().find_map(|field| {
                    stream
                        .tags
                        .get(*field)
                        .filter(|raw| raw.contains('T'))
                        .and_then(|raw| parse_video_datetime(raw))
                })
            })
        })
    }
}

pub trait MetadataProbe {
    fn probe(&self, path: &Path, timeout: Duration) -> Result<ProbeDocument, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl MetadataProbe for FfprobeProbe {
    fn probe(&self, path: &Path, timeout: Duration) -> Result<ProbeDocument, ProbeError> {
        let mut child = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Drain both pipes off-thread so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    abandon(&mut child);
                    return Err(err.into());
                }
            }
            if Instant::now() >= deadline {
                abandon(&mut child);
                return Err(ProbeError::Timeout { timeout });
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout);
        if !status.success() {
            let stderr = String::from_utf8_lossy(&collect(stderr)).trim().to_string();
            return Err(ProbeError::Exit { status, stderr });
        }

        ProbeDocument::from_json(&stdout)
    }
}

/// Kills and reaps a child that is no longer waited on.
fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

pub fn read_video_date(probe: &dyn MetadataProbe, path: &Path, timeout: Duration) -> Extraction {
    match probe.probe(path, timeout) {
        Ok(document) => Extraction {
            date: document.capture_date(),
            warning: None,
        },
        Err(source) => Extraction::warned(ExtractWarning::Probe {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// ISO-8601 (fraction and offset dropped, clock reading kept) or one of the
/// literal `YYYY-MM-DD HH:MM:SS` / `YYYY:MM:DD HH:MM:SS` layouts.
pub fn parse_video_datetime(input: &str) -> Option<NaiveDateTime> {
    let normalized = input.trim();

    if normalized.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(normalized) {
            return dt.naive_local().with_nanosecond(0);
        }
        if let Ok(dt) = DateTime::parse_from_str(normalized, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return dt.naive_local().with_nanosecond(0);
        }
        let without_zulu = normalized.strip_suffix('Z').unwrap_or(normalized);
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(without_zulu, fmt) {
                return naive.with_nanosecond(0);
            }
        }
        return None;
    }

    ["%Y-%m-%d %H:%M:%S", "%Y:%m:%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(normalized, fmt).ok())
}
