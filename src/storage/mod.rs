pub mod index;

pub use index::{IdentityIndex, IndexCounts, RecordOutcome};

pub const SRC_PATH_SEEN: &str = "srcPathSeen";
pub const DST_HASH_TO_PATH: &str = "dstHash2Path";
pub const DST_PATH_TO_HASH: &str = "dstPath2Hash";

pub const COLUMN_FAMILIES: [&str; 3] = [SRC_PATH_SEEN, DST_HASH_TO_PATH, DST_PATH_TO_HASH];
