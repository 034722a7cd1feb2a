use super::{COLUMN_FAMILIES, DST_HASH_TO_PATH, DST_PATH_TO_HASH, SRC_PATH_SEEN};
use crate::error::{Error, Result};
use crate::hasher::ContentHash;
use rocksdb::{ColumnFamily, IteratorMode, Options, TransactionDB, TransactionDBOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Outcome of [`IdentityIndex::record_destination`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Both destination relations were written.
    Recorded,
    /// The hash already maps to exactly this path.
    AlreadyRecorded,
    /// The hash is canonically archived elsewhere; only the path relation was
    /// written for this path.
    Alias { canonical: PathBuf },
    /// Dry-run: nothing was written.
    Skipped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexCounts {
    pub src_paths_seen: usize,
    pub dst_hashes: usize,
    pub dst_paths: usize,
}

/// Persistent identity index over a RocksDB transaction database.
///
/// Holds three append-only relations: source path to hash (the seen-set),
/// destination hash to canonical archive path, and its inverse. Every public
/// operation is one transaction; records are never deleted or rewritten.
pub struct IdentityIndex {
    db: TransactionDB,
    dry_run: bool,
}

impl IdentityIndex {
    /// Open (or create) the store at `path` with all three namespaces.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.create_missing_column_families(true);

        let db = TransactionDB::open_cf(
            &db_options,
            &TransactionDBOptions::default(),
            path,
            COLUMN_FAMILIES,
        )?;
        info!(path = %path.display(), "Opened identity index");

        Ok(Self { db, dry_run: false })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or(Error::MissingColumnFamily(name))
    }

    /// Seen-set lookup. `None` means the ingest pipeline never finished this path.
    pub fn lookup_source_hash(&self, path: &Path) -> Result<Option<ContentHash>> {
        let value = self.db.get_cf(self.cf(SRC_PATH_SEEN)?, path_key(path))?;
        let hash = value
            .map(|bytes| decode_hash(SRC_PATH_SEEN, &bytes))
            .transpose()?;
        if let Some(hash) = &hash {
            trace!(path = %path.display(), hash = %hash, "Source path already seen");
        }
        Ok(hash)
    }

    /// Lookup in the destination path relation, used by the index pipeline.
    pub fn lookup_destination_hash(&self, path: &Path) -> Result<Option<ContentHash>> {
        self.db
            .get_cf(self.cf(DST_PATH_TO_HASH)?, path_key(path))?
            .map(|bytes| decode_hash(DST_PATH_TO_HASH, &bytes))
            .transpose()
    }

    pub fn destination_path_for(&self, hash: &ContentHash) -> Result<Option<PathBuf>> {
        Ok(self
            .db
            .get_cf(self.cf(DST_HASH_TO_PATH)?, hash.as_bytes())?
            .map(|bytes| decode_path(&bytes)))
    }

    pub fn hash_exists_in_destination(&self, hash: &ContentHash) -> Result<bool> {
        Ok(self
            .db
            .get_cf(self.cf(DST_HASH_TO_PATH)?, hash.as_bytes())?
            .is_some())
    }

    /// Record `path` as the archive location of `hash`.
    ///
    /// The hash relation is first-writer-wins: the read takes a row lock and
    /// both relations are committed together, so no reader ever sees one
    /// without the other.
    pub fn record_destination(&self, hash: &ContentHash, path: &Path) -> Result<RecordOutcome> {
        if self.dry_run {
            info!(
                path = %path.display(),
                hash = %hash,
                "Would have added destination file to index"
            );
            return Ok(RecordOutcome::Skipped);
        }

        let hash_cf = self.cf(DST_HASH_TO_PATH)?;
        let path_cf = self.cf(DST_PATH_TO_HASH)?;
        let path_bytes = path_key(path);

        let txn = self.db.transaction();
        let existing = txn.get_for_update_cf(hash_cf, hash.as_bytes(), true)?;
        let outcome = match existing {
            None => {
                txn.put_cf(hash_cf, hash.as_bytes(), &path_bytes)?;
                txn.put_cf(path_cf, &path_bytes, hash.as_bytes())?;
                RecordOutcome::Recorded
            }
            Some(current) if current == path_bytes => RecordOutcome::AlreadyRecorded,
            Some(current) => {
                txn.put_cf(path_cf, &path_bytes, hash.as_bytes())?;
                RecordOutcome::Alias {
                    canonical: decode_path(&current),
                }
            }
        };
        txn.commit()?;

        match &outcome {
            RecordOutcome::Recorded => {
                debug!(path = %path.display(), hash = %hash, "Added destination file to index")
            }
            RecordOutcome::Alias { canonical } => warn!(
                path = %path.display(),
                canonical = %canonical.display(),
                hash = %hash,
                "Content already archived under another path"
            ),
            _ => {}
        }
        Ok(outcome)
    }

    /// Add `path` to the seen-set.
    pub fn record_source(&self, path: &Path, hash: &ContentHash) -> Result<()> {
        if self.dry_run {
            info!(path = %path.display(), hash = %hash, "Would have added source file to index");
            return Ok(());
        }
        self.db
            .put_cf(self.cf(SRC_PATH_SEEN)?, path_key(path), hash.as_bytes())?;
        debug!(path = %path.display(), hash = %hash, "Added source file to index");
        Ok(())
    }

    pub fn counts(&self) -> Result<IndexCounts> {
        Ok(IndexCounts {
            src_paths_seen: self.count_keys(SRC_PATH_SEEN)?,
            dst_hashes: self.count_keys(DST_HASH_TO_PATH)?,
            dst_paths: self.count_keys(DST_PATH_TO_HASH)?,
        })
    }

    fn count_keys(&self, name: &'static str) -> Result<usize> {
        let mut count = 0usize;
        for item in self.db.iterator_cf(self.cf(name)?, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

fn path_key(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

fn decode_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

fn decode_hash(namespace: &'static str, bytes: &[u8]) -> Result<ContentHash> {
    ContentHash::from_slice(bytes).ok_or_else(|| Error::CorruptRecord {
        namespace,
        reason: format!("expected 32 hash bytes, found {}", bytes.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::HASH_LENGTH;

    fn open_temp() -> (tempfile::TempDir, IdentityIndex) {
        let dir = tempfile::tempdir().unwrap();
        let index = IdentityIndex::open(dir.path().join("index.db")).unwrap();
        (dir, index)
    }

    #[test]
    fn test_unknown_source_path_is_unseen() {
        let (_dir, index) = open_temp();
        assert_eq!(index.lookup_source_hash(Path::new("/src/a.jpg")).unwrap(), None);
    }

    #[test]
    fn test_record_and_lookup_source() {
        let (_dir, index) = open_temp();
        let hash = ContentHash::from_bytes([3; HASH_LENGTH]);
        index.record_source(Path::new("/src/a.jpg"), &hash).unwrap();
        assert_eq!(
            index.lookup_source_hash(Path::new("/src/a.jpg")).unwrap(),
            Some(hash)
        );
    }

    #[test]
    fn test_corrupt_hash_value_is_reported() {
        let (_dir, index) = open_temp();
        let cf = index.cf(SRC_PATH_SEEN).unwrap();
        index.db.put_cf(cf, b"/src/bad.jpg", b"short").unwrap();
        let err = index.lookup_source_hash(Path::new("/src/bad.jpg")).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { namespace: SRC_PATH_SEEN, .. }));
    }
}
