//! Capture-date extraction from embedded EXIF metadata.
//!
//! Missing, stripped or malformed metadata is an expected case (videos, RAW
//! sidecars, screenshots) and always resolves to [`CapturedDate::Unknown`]
//! instead of an error.

mod reader;

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::io::{BufRead, Seek};
use std::path::Path;
use tracing::{debug, warn};

pub use reader::{ExifReader, DATE_TAGS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapturedDate {
    Known { year: i32, month: u32, day: u32 },
    /// Rendered as the year-0 partition by placement.
    Unknown,
}

impl CapturedDate {
    pub fn is_known(&self) -> bool {
        matches!(self, CapturedDate::Known { .. })
    }
}

impl From<NaiveDate> for CapturedDate {
    fn from(date: NaiveDate) -> Self {
        CapturedDate::Known {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for CapturedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturedDate::Known { year, month, day } => {
                write!(f, "{}-{:02}-{:02}", year, month, day)
            }
            CapturedDate::Unknown => f.write_str("unknown"),
        }
    }
}

/// Resolve the capture date of the file at `path`, falling back through
/// `DateTimeOriginal`, `DateTimeDigitized` and `GPSDateStamp`.
pub fn resolve_capture_date(path: &Path) -> CapturedDate {
    let reader = match ExifReader::from_path(path) {
        Ok(reader) => reader,
        Err(exif::Error::Io(e)) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Could not read metadata, using unknown date"
            );
            return CapturedDate::Unknown;
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No usable metadata, using unknown date");
            return CapturedDate::Unknown;
        }
    };

    match reader.capture_date() {
        Some((tag, date)) => {
            debug!(path = %path.display(), tag = %tag, date = %date, "Resolved capture date");
            CapturedDate::from(date)
        }
        None => {
            debug!(path = %path.display(), "No recognized date tags, using unknown date");
            CapturedDate::Unknown
        }
    }
}

/// Same resolution over an in-memory or already opened container.
pub fn capture_date_from_reader<R: BufRead + Seek>(reader: &mut R) -> CapturedDate {
    match ExifReader::from_reader(reader) {
        Ok(reader) => reader
            .capture_date()
            .map(|(_, date)| CapturedDate::from(date))
            .unwrap_or(CapturedDate::Unknown),
        Err(e) => {
            debug!(error = %e, "No usable metadata, using unknown date");
            CapturedDate::Unknown
        }
    }
}
