use crate::metadata::{ExtractWarning, Extraction};
use chrono::NaiveDateTime;
use exif::{Context, Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// JPEG/PNG/TIFF/BMP. The primary directory is scanned once and the first
/// date tag that parses wins; the EXIF sub-directory is only consulted when
/// the primary directory yields nothing. BMP carries no EXIF block.
pub fn read_image_date(path: &Path) -> Extraction {
    match read_container(path) {
        Ok(Some(exif)) => Extraction {
            date: scan_directories(&exif),
            warning: None,
        },
        Ok(None) => Extraction::absent(),
        Err(ExtractWarning::Exif {
            source: exif::Error::InvalidFormat(_),
            ..
        }) if is_bmp(path) => Extraction::absent(),
        Err(warning) => Extraction::warned(warning),
    }
}

pub fn read_heic_date(path: &Path) -> Extraction {
    match read_container(path) {
        Ok(Some(exif)) => Extraction {
            date: scan_directories(&exif),
            warning: None,
        },
        Ok(None) => Extraction::absent(),
        Err(ExtractWarning::Exif {
            source: exif::Error::NotSupported(_),
            ..
        }) => Extraction::warned(ExtractWarning::HeicUnsupported {
            path: path.to_path_buf(),
        }),
        Err(warning) => Extraction::warned(warning),
    }
}

/// DNG is TIFF based; tags are checked in strict priority order.
pub fn read_dng_date(path: &Path) -> Extraction {
    match read_container(path) {
        Ok(Some(exif)) => Extraction {
            date: DATE_TAGS.iter().find_map(|tag| {
                exif.get_field(*tag, In::PRIMARY)
                    .and_then(ascii_value)
                    .and_then(|raw| parse_exif_datetime(&raw))
            }),
            warning: None,
        },
        Ok(None) => Extraction::absent(),
        Err(warning) => Extraction::warned(warning),
    }
}

fn read_container(path: &Path) -> Result<Option<Exif>, ExtractWarning> {
    let file = File::open(path).map_err(|source| ExtractWarning::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = BufReader::new(file);
    match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(source) => Err(ExtractWarning::Exif {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn scan_directories(exif: &Exif) -> Option<NaiveDateTime> {
    first_date_in(exif, Context::Tiff).or_else(|| first_date_in(exif, Context::Exif))
}

// Tags are matched by number: a date tag stored outside its usual directory
// still counts for the directory it sits in.
fn first_date_in(exif: &Exif, context: Context) -> Option<NaiveDateTime> {
    exif.fields()
        .filter(|field| field.ifd_num == In::PRIMARY && field.tag.context() == context)
        .filter(|field| is_date_tag(field.tag))
        .find_map(|field| ascii_value(field).and_then(|raw| parse_exif_datetime(&raw)))
}

fn is_date_tag(tag: Tag) -> bool {
    DATE_TAGS.iter().any(|date| date.number() == tag.number())
}

fn is_bmp(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bmp"))
}

fn ascii_value(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(|s| s.trim_end_matches('\0').to_string()),
        _ => None,
    }
}

/// Only the exact `YYYY:MM:DD HH:MM:SS` layout is accepted.
pub fn parse_exif_datetime(input: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, EXIF_DATE_FORMAT).ok()
}
