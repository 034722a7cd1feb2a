use chrono::NaiveDate;
use exif::{Exif, In, Tag, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

/// Date tags in the order they are trusted.
pub const DATE_TAGS: [Tag; 3] = [
    Tag::DateTimeOriginal,
    Tag::DateTimeDigitized,
    Tag::GPSDateStamp,
];

pub struct ExifReader(Exif);

impl ExifReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, exif::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::from_reader(&mut reader)
    }

    pub fn from_reader<R: BufRead + Seek>(reader: &mut R) -> Result<Self, exif::Error> {
        Ok(Self(exif::Reader::new().read_from_container(reader)?))
    }

    /// The first date tag that is present and holds a valid calendar date.
    pub fn capture_date(&self) -> Option<(Tag, NaiveDate)> {
        DATE_TAGS
            .iter()
            .find_map(|&tag| self.tag_date(tag).map(|date| (tag, date)))
    }

    fn tag_date(&self, tag: Tag) -> Option<NaiveDate> {
        let field = self.0.get_field(tag, In::PRIMARY)?;
        let raw = match &field.value {
            Value::Ascii(values) => values.first()?,
            _ => return None,
        };
        if tag == Tag::GPSDateStamp {
            parse_gps_date(raw)
        } else {
            parse_exif_datetime(raw)
        }
    }
}

/// `YYYY:MM:DD HH:MM:SS`, as written by cameras.
pub(crate) fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDate> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))
}

/// `YYYY:MM:DD`, the GPS receiver's UTC date.
pub(crate) fn parse_gps_date(raw: &[u8]) -> Option<NaiveDate> {
    let text = std::str::from_utf8(raw).ok()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDate::parse_from_str(text, "%Y:%m:%d").ok()
}
