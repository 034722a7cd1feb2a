use crate::hasher::ContentHash;
use crate::metadata::CapturedDate;
use std::path::{Path, PathBuf};

/// Where a piece of content lives in the archive. Pure function of the
/// archive root, content hash, capture date and original file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub folder: PathBuf,
    pub file: PathBuf,
}

impl Placement {
    pub fn compute(
        archive_root: &Path,
        hash: &ContentHash,
        date: &CapturedDate,
        file_name: &str,
    ) -> Self {
        let folder = archive_root.join(partition(date));
        let file = match date {
            CapturedDate::Known { .. } => folder.join(file_name),
            // Undated files commonly share names (IMG_0001.JPG); the hash keeps them apart.
            CapturedDate::Unknown => folder.join(format!("{}-{}", hash.to_hex(), file_name)),
        };
        Self { folder, file }
    }
}

/// `<year>/<year>-<MM>/<year>-<MM>-<DD>`, or `0/0-00/0-00-00` for unknown dates.
pub fn partition(date: &CapturedDate) -> PathBuf {
    let (year, month, day) = match *date {
        CapturedDate::Known { year, month, day } => (year, month, day),
        CapturedDate::Unknown => (0, 0, 0),
    };
    PathBuf::from(year.to_string())
        .join(format!("{}-{:02}", year, month))
        .join(format!("{}-{:02}-{:02}", year, month, day))
}
