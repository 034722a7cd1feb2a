//! Materializes an archive file from a source file exactly once.

use crate::hasher;
use crate::platform;
use std::fs::{self, File, FileType};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name prefix of staged copies; scanners skip these half-written files.
pub const STAGING_PREFIX: &str = ".photoimportd-";

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("non-regular source file {} ({kind})", path.display())]
    NotRegular { path: PathBuf, kind: &'static str },

    #[error("destination {} is occupied by different content", path.display())]
    DestinationOccupied { path: PathBuf },

    #[error("destination {} has no parent folder", path.display())]
    NoParent { path: PathBuf },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// `dst` already holds this content, either as the same inode or as an
    /// identical copy left behind by an interrupted run.
    AlreadyPresent,
    Linked,
    Copied { bytes: u64 },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> TransferError + '_ {
    move |source| TransferError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn describe(file_type: FileType) -> &'static str {
    if file_type.is_dir() {
        "directory"
    } else if file_type.is_symlink() {
        "symlink"
    } else {
        "special file"
    }
}

/// Give `dst` the exact content of `src`.
///
/// Prefers a hard link; falls back to a streamed copy into a temp file in the
/// destination folder which is synced and then renamed into place without
/// clobbering. The destination folder must already exist.
pub fn transfer(src: &Path, dst: &Path) -> Result<TransferOutcome, TransferError> {
    let src_meta = fs::symlink_metadata(src).map_err(io_err(src))?;
    if !src_meta.file_type().is_file() {
        return Err(TransferError::NotRegular {
            path: src.to_path_buf(),
            kind: describe(src_meta.file_type()),
        });
    }

    match fs::symlink_metadata(dst) {
        Ok(dst_meta) => {
            if !dst_meta.file_type().is_file() {
                return Err(TransferError::DestinationOccupied {
                    path: dst.to_path_buf(),
                });
            }
            if platform::is_same_file(&src_meta, &dst_meta) {
                return Ok(TransferOutcome::AlreadyPresent);
            }
            if dst_meta.len() == src_meta.len()
                && hasher::hash_file(src).map_err(io_err(src))?
                    == hasher::hash_file(dst).map_err(io_err(dst))?
            {
                return Ok(TransferOutcome::AlreadyPresent);
            }
            return Err(TransferError::DestinationOccupied {
                path: dst.to_path_buf(),
            });
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(dst)(e)),
    }

    match fs::hard_link(src, dst) {
        Ok(()) => return Ok(TransferOutcome::Linked),
        Err(e) => debug!(
            src = %src.display(),
            dst = %dst.display(),
            error = %e,
            "Hard link failed, falling back to copy"
        ),
    }

    let bytes = copy_contents(src, dst)?;
    Ok(TransferOutcome::Copied { bytes })
}

fn copy_contents(src: &Path, dst: &Path) -> Result<u64, TransferError> {
    let folder = dst.parent().ok_or_else(|| TransferError::NoParent {
        path: dst.to_path_buf(),
    })?;

    let mut input = File::open(src).map_err(io_err(src))?;
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(folder)
        .map_err(io_err(folder))?;

    let bytes = io::copy(&mut input, staged.as_file_mut()).map_err(io_err(dst))?;
    staged.as_file().sync_all().map_err(io_err(dst))?;

    staged.persist_noclobber(dst).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            TransferError::DestinationOccupied {
                path: dst.to_path_buf(),
            }
        } else {
            io_err(dst)(e.error)
        }
    })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_creates_identical_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("dst.jpg");
        fs::write(&src, b"photo bytes").unwrap();

        let outcome = transfer(&src, &dst).unwrap();
        assert!(matches!(
            outcome,
            TransferOutcome::Linked | TransferOutcome::Copied { .. }
        ));
        assert_eq!(fs::read(&dst).unwrap(), b"photo bytes");
        assert_eq!(fs::read(&src).unwrap(), b"photo bytes");
    }

    #[test]
    fn test_transfer_twice_is_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("dst.jpg");
        fs::write(&src, b"photo bytes").unwrap();

        transfer(&src, &dst).unwrap();
        assert_eq!(transfer(&src, &dst).unwrap(), TransferOutcome::AlreadyPresent);
    }

    #[test]
    fn test_identical_leftover_copy_is_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("dst.jpg");
        fs::write(&src, b"photo bytes").unwrap();
        fs::write(&dst, b"photo bytes").unwrap();
        assert_eq!(transfer(&src, &dst).unwrap(), TransferOutcome::AlreadyPresent);
    }

    #[test]
    fn test_different_content_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.jpg");
        let dst = dir.path().join("dst.jpg");
        fs::write(&src, b"new bytes").unwrap();
        fs::write(&dst, b"old bytes").unwrap();

        let err = transfer(&src, &dst).unwrap_err();
        assert!(matches!(err, TransferError::DestinationOccupied { .. }));
        assert_eq!(fs::read(&dst).unwrap(), b"old bytes");
    }

    #[test]
    fn test_directory_source_is_not_regular() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("folder");
        fs::create_dir(&src).unwrap();
        let err = transfer(&src, &dir.path().join("dst")).unwrap_err();
        assert!(matches!(err, TransferError::NotRegular { kind: "directory", .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_source_is_not_regular() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.jpg");
        let link = dir.path().join("link.jpg");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let err = transfer(&link, &dir.path().join("dst.jpg")).unwrap_err();
        assert!(matches!(err, TransferError::NotRegular { kind: "symlink", .. }));
    }

    #[test]
    fn test_copy_contents_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(&src, vec![1u8; 100_000]).unwrap();

        let bytes = copy_contents(&src, &out.join("copy.bin")).unwrap();
        assert_eq!(bytes, 100_000);
        let names: Vec<_> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("copy.bin")]);
    }
}
