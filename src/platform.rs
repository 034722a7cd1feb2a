use std::fs::Metadata;
use std::io;
use std::path::Path;

/// Whether two metadata records describe the same filesystem object.
#[cfg(unix)]
pub fn is_same_file(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
pub fn is_same_file(_a: &Metadata, _b: &Metadata) -> bool {
    false
}

/// Create `path` and any missing parents, open enough for the service user
/// (subject to the process umask).
#[cfg(unix)]
pub fn create_dir_all_permissive(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(path)
}

#[cfg(not(unix))]
pub fn create_dir_all_permissive(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}
