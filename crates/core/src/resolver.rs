use crate::exif_reader::{read_dng_date, read_heic_date, read_image_date};
use crate::media::MediaFormat;
use crate::metadata::{DateSource, Extraction, ResolvedDate};
use crate::video_probe::{read_video_date, FfprobeProbe, MetadataProbe, DEFAULT_PROBE_TIMEOUT};
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Filesystem timestamps in local clock time. Any of them may be missing
/// depending on the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTimes {
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,
}

impl FileTimes {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self {
            created: meta.created().ok().map(to_local),
            modified: meta.modified().ok().map(to_local),
            accessed: meta.accessed().ok().map(to_local),
        })
    }

    /// A creation time later than the modification time means the file was
    /// copied or moved, so the modification time is used as-is. Otherwise the
    /// earliest available timestamp wins.
    pub fn fallback(&self) -> Option<(NaiveDateTime, DateSource)> {
        if let (Some(created), Some(modified)) = (self.created, self.modified) {
            if created > modified {
                return Some((modified, DateSource::FallbackModified));
            }
        }

        [self.created, self.modified, self.accessed]
            .into_iter()
            .flatten()
            .min()
            .map(|date| (date, DateSource::FallbackEarliest))
    }
}

fn to_local(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

impl MediaFormat {
    pub fn date_source(self) -> DateSource {
        match self {
            Self::Image => DateSource::ImageExif,
            Self::Heic => DateSource::HeicExif,
            Self::Dng => DateSource::DngExif,
            Self::Video => DateSource::VideoProbe,
        }
    }
}

pub struct DateResolver {
    probe: Box<dyn MetadataProbe>,
    probe_timeout: Duration,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(Box::new(FfprobeProbe::default()), DEFAULT_PROBE_TIMEOUT)
    }
}

impl DateResolver {
    pub fn new(probe: Box<dyn MetadataProbe>, probe_timeout: Duration) -> Self {
        Self {
            probe,
            probe_timeout,
        }
    }

    pub fn extract(&self, format: MediaFormat, path: &Path) -> Extraction {
        match format {
            MediaFormat::Image => read_image_date(path),
            MediaFormat::Heic => read_heic_date(path),
            MediaFormat::Dng => read_dng_date(path),
            MediaFormat::Video => read_video_date(self.probe.as_ref(), path, self.probe_timeout),
        }
    }

    /// Always yields a date: embedded metadata first, then filesystem times,
    /// then the current time when even those cannot be read.
    pub fn resolve(&self, path: &Path) -> ResolvedDate {
        let mut warning = None;

        if let Some(format) = MediaFormat::from_path(path) {
            let extraction = self.extract(format, path);
            if let Some(date) = extraction.date {
                debug!(path = %path.display(), %date, "メタデータから撮影日時を取得");
                return ResolvedDate {
                    date,
                    source: format.date_source(),
                    warning: None,
                };
            }
            warning = extraction.warning.map(|w| w.to_string());
        }

        let (date, source) = FileTimes::read(path)
            .ok()
            .and_then(|times| times.fallback())
            .unwrap_or_else(|| (Local::now().naive_local(), DateSource::FallbackNow));
        debug!(path = %path.display(), %date, ?source, "ファイル日時で代用");

        ResolvedDate {
            date,
            source,
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DateResolver, FileTimes};
    use crate::metadata::DateSource;
    use crate::test_support::{datetime, set_file_times, write_jpeg_with_dates, FakeProbe};
    use exif::Tag;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn fallback_prefers_modified_when_created_is_newer() {
        let times = FileTimes {
            created: Some(datetime(2024, 6, 1, 12, 0, 0)),
            modified: Some(datetime(2020, 1, 1, 9, 0, 0)),
            accessed: Some(datetime(2019, 1, 1, 9, 0, 0)),
        };
        assert_eq!(
            times.fallback(),
            Some((datetime(2020, 1, 1, 9, 0, 0), DateSource::FallbackModified))
        );
    }

    #[test]
    fn fallback_uses_earliest_when_created_is_older() {
        let times = FileTimes {
            created: Some(datetime(2020, 1, 1, 9, 0, 0)),
            modified: Some(datetime(2021, 1, 1, 9, 0, 0)),
            accessed: Some(datetime(2019, 5, 5, 5, 5, 5)),
        };
        assert_eq!(
            times.fallback(),
            Some((datetime(2019, 5, 5, 5, 5, 5), DateSource::FallbackEarliest))
        );
    }

    #[test]
    fn fallback_without_creation_time_uses_remaining_minimum() {
        let times = FileTimes {
            created: None,
            modified: Some(datetime(2021, 1, 1, 9, 0, 0)),
            accessed: Some(datetime(2022, 1, 1, 9, 0, 0)),
        };
        assert_eq!(
            times.fallback(),
            Some((datetime(2021, 1, 1, 9, 0, 0), DateSource::FallbackEarliest))
        );
        assert_eq!(FileTimes::default().fallback(), None);
    }

    #[test]
    fn resolve_uses_exif_when_available() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("IMG_0001.JPG");
        write_jpeg_with_dates(&path, &[(Tag::DateTimeOriginal, "2023:01:15 08:00:00")]);

        let resolved = DateResolver::new(Box::new(FakeProbe::empty()), Duration::from_secs(1))
            .resolve(&path);
        assert_eq!(resolved.date, datetime(2023, 1, 15, 8, 0, 0));
        assert_eq!(resolved.source, DateSource::ImageExif);
        assert!(resolved.warning.is_none());
    }

    #[test]
    fn resolve_png_without_exif_falls_back_to_file_times() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("screenshot.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").expect("write png");
        let modified = datetime(2018, 7, 7, 7, 7, 7);
        set_file_times(&path, modified);

        let resolver = DateResolver::new(Box::new(FakeProbe::empty()), Duration::from_secs(1));
        assert!(resolver
            .extract(crate::media::MediaFormat::Image, &path)
            .date
            .is_none());

        let resolved = resolver.resolve(&path);
        assert!(resolved.source.is_fallback());
        assert_eq!(resolved.date, modified);
    }

    #[test]
    fn resolve_video_reads_probe_document() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.MOV");
        fs::write(&path, "2023-01-15T09:00:00.000000Z").expect("write mov");

        let probe = FakeProbe::reading_contents();
        let resolved = DateResolver::new(Box::new(probe), Duration::from_secs(1)).resolve(&path);
        assert_eq!(resolved.date, datetime(2023, 1, 15, 9, 0, 0));
        assert_eq!(resolved.source, DateSource::VideoProbe);
    }

    #[test]
    fn resolve_keeps_probe_warning_when_falling_back() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mp4");
        fs::write(&path, b"ftyp").expect("write mp4");
        set_file_times(&path, datetime(2016, 3, 3, 3, 3, 3));

        let probe = FakeProbe::failing(|| crate::video_probe::ProbeError::Timeout {
            timeout: Duration::from_secs(30),
        });
        let resolved = DateResolver::new(Box::new(probe), Duration::from_secs(30)).resolve(&path);
        assert!(resolved.source.is_fallback());
        assert_eq!(resolved.date, datetime(2016, 3, 3, 3, 3, 3));
        assert!(resolved.warning.is_some());
    }
}
