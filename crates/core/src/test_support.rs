use crate::video_probe::{MetadataProbe, ProbeDocument, ProbeError, ProbeSection};
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use filetime::FileTime;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .expect("valid datetime")
}

/// Little-endian TIFF holding only the given ASCII date tags.
pub(crate) fn tiff_with_dates(tags: &[(Tag, &str)]) -> Vec<u8> {
    let fields: Vec<Field> = tags
        .iter()
        .map(|(tag, value)| Field {
            tag: *tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![value.as_bytes().to_vec()]),
        })
        .collect();

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, true).expect("write tiff");
    buf.into_inner()
}

/// Minimal JPEG: SOI, an APP1 Exif segment, EOI.
pub(crate) fn write_jpeg_with_dates(path: &Path, tags: &[(Tag, &str)]) {
    let tiff = tiff_with_dates(tags);
    let segment_len = u16::try_from(2 + 6 + tiff.len()).expect("segment fits");

    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1];
    bytes.extend_from_slice(&segment_len.to_be_bytes());
    bytes.extend_from_slice(b"Exif\0\0");
    bytes.extend_from_slice(&tiff);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    fs::write(path, bytes).expect("write jpeg");
}

/// Pins both mtime and atime to a local clock value.
pub(crate) fn set_file_times(path: &Path, local: NaiveDateTime) {
    let stamp = Local
        .from_local_datetime(&local)
        .single()
        .expect("unambiguous local time")
        .timestamp();
    let time = FileTime::from_unix_time(stamp, 0);
    filetime::set_file_times(path, time, time).expect("set file times");
}

#[cfg(unix)]
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

/// Stands in for ffprobe: the file body is reported as the container's
/// `creation_time` tag, so the answer follows the file across renames.
pub(crate) struct FakeProbe {
    read_contents: bool,
    failure: Option<Box<dyn Fn() -> ProbeError>>,
}

impl FakeProbe {
    pub(crate) fn empty() -> Self {
        Self {
            read_contents: false,
            failure: None,
        }
    }

    pub(crate) fn reading_contents() -> Self {
        Self {
            read_contents: true,
            failure: None,
        }
    }

    pub(crate) fn failing(make_error: impl Fn() -> ProbeError + 'static) -> Self {
        Self {
            read_contents: false,
            failure: Some(Box::new(make_error)),
        }
    }
}

impl MetadataProbe for FakeProbe {
    fn probe(&self, path: &Path, _timeout: Duration) -> Result<ProbeDocument, ProbeError> {
        if let Some(make_error) = &self.failure {
            return Err(make_error());
        }
        if !self.read_contents {
            return Ok(ProbeDocument::default());
        }

        let value = fs::read_to_string(path)?;
        let mut tags = HashMap::new();
        tags.insert("creation_time".to_string(), value.trim().to_string());
        Ok(ProbeDocument {
            format: Some(ProbeSection { tags }),
            streams: Vec::new(),
        })
    }
}

fn iso_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let size = u32::try_from(8 + body.len()).expect("box fits");
    let mut out = size.to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

/// HEIF skeleton whose only item is an Exif block. With construction method
/// 1 the block lives in `idat`; method 2 (item offset) is valid HEIF that the
/// EXIF decoder refuses.
pub(crate) fn heif_with_exif(tags: &[(Tag, &str)], construction_method: u8) -> Vec<u8> {
    // Exif block: 4-byte header offset, then the TIFF stream.
    let mut payload = 0u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&tiff_with_dates(tags));
    let payload_len = u32::try_from(payload.len()).expect("payload fits");

    let mut infe = vec![2, 0, 0, 0];
    infe.extend_from_slice(&1u16.to_be_bytes());
    infe.extend_from_slice(&0u16.to_be_bytes());
    infe.extend_from_slice(b"Exif");
    let mut iinf = vec![0, 0, 0, 0];
    iinf.extend_from_slice(&1u16.to_be_bytes());
    iinf.extend(iso_box(b"infe", &infe));

    // Version 1: 4-byte offsets and lengths, no base offset or index.
    let mut iloc = vec![1, 0, 0, 0];
    iloc.extend_from_slice(&0x4400u16.to_be_bytes());
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&[0, construction_method]);
    iloc.extend_from_slice(&0u16.to_be_bytes());
    iloc.extend_from_slice(&1u16.to_be_bytes());
    iloc.extend_from_slice(&0u32.to_be_bytes());
    iloc.extend_from_slice(&payload_len.to_be_bytes());

    let mut meta = vec![0, 0, 0, 0];
    meta.extend(iso_box(b"iinf", &iinf));
    meta.extend(iso_box(b"iloc", &iloc));
    meta.extend(iso_box(b"idat", &payload));

    let mut out = iso_box(b"ftyp", b"heic\0\0\0\0mif1heic");
    out.extend(iso_box(b"meta", &meta));
    out
}
