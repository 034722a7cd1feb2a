use super::ContentHash;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Stream a reader through BLAKE3 in fixed-size chunks, never holding more
/// than one buffer of the input in memory.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hasher.finalize().into())
}

pub fn hash_file(file: &Path) -> io::Result<ContentHash> {
    let f = File::open(file)?;
    let hash = hash_reader(f)?;
    trace!(path = %file.display(), hash = %hash, "Hashed file");
    Ok(hash)
}
