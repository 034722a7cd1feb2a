#![allow(dead_code)]

use photoimportd::pipeline::{Pipeline, PipelineMode};
use photoimportd::{AppConfig, IdentityIndex};
use photoimportd::metrics::Metrics;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Clone, Copy)]
pub enum DateTag {
    Original,
    Digitized,
    GpsDate,
}

const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_GPS_IFD_POINTER: u16 = 0x8825;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;
const TAG_GPS_DATE_STAMP: u16 = 0x001D;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

fn ifd_len(entries: usize) -> usize {
    2 + 12 * entries + 4
}

fn push_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_ascii_ifd(
    out: &mut Vec<u8>,
    entries: &[(u16, &str)],
    data_off: &mut usize,
    data: &mut Vec<u8>,
) {
    if entries.is_empty() {
        return;
    }
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, text) in entries {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        let count = bytes.len() as u32;
        if bytes.len() <= 4 {
            bytes.resize(4, 0);
            let inline = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            push_entry(out, *tag, TYPE_ASCII, count, inline);
        } else {
            push_entry(out, *tag, TYPE_ASCII, count, *data_off as u32);
            if bytes.len() % 2 == 1 {
                bytes.push(0);
            }
            *data_off += bytes.len();
            data.extend_from_slice(&bytes);
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
}

/// A minimal little-endian TIFF container carrying only the given date tags.
pub fn tiff_with_dates(tags: &[(DateTag, &str)]) -> Vec<u8> {
    let mut exif: Vec<(u16, &str)> = Vec::new();
    let mut gps: Vec<(u16, &str)> = Vec::new();
    for (tag, value) in tags {
        match tag {
            DateTag::Original => exif.push((TAG_DATE_TIME_ORIGINAL, *value)),
            DateTag::Digitized => exif.push((TAG_DATE_TIME_DIGITIZED, *value)),
            DateTag::GpsDate => gps.push((TAG_GPS_DATE_STAMP, *value)),
        }
    }
    exif.sort_by_key(|(tag, _)| *tag);

    let ifd0_entries = usize::from(!exif.is_empty()) + usize::from(!gps.is_empty());
    let exif_off = 8 + ifd_len(ifd0_entries);
    let gps_off = exif_off + if exif.is_empty() { 0 } else { ifd_len(exif.len()) };
    let mut data_off = gps_off + if gps.is_empty() { 0 } else { ifd_len(gps.len()) };

    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    out.extend_from_slice(&(ifd0_entries as u16).to_le_bytes());
    if !exif.is_empty() {
        push_entry(&mut out, TAG_EXIF_IFD_POINTER, TYPE_LONG, 1, exif_off as u32);
    }
    if !gps.is_empty() {
        push_entry(&mut out, TAG_GPS_IFD_POINTER, TYPE_LONG, 1, gps_off as u32);
    }
    out.extend_from_slice(&0u32.to_le_bytes());

    let mut data = Vec::new();
    push_ascii_ifd(&mut out, &exif, &mut data_off, &mut data);
    push_ascii_ifd(&mut out, &gps, &mut data_off, &mut data);
    out.extend_from_slice(&data);
    out
}

pub fn photo_taken(date_time: &str) -> Vec<u8> {
    tiff_with_dates(&[(DateTag::Original, date_time)])
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Every regular file below `root`, sorted.
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(list_files(&path));
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

pub struct Fixture {
    pub dir: TempDir,
    pub src: PathBuf,
    pub dst: PathBuf,
    pub db: PathBuf,
    pub config: Arc<AppConfig>,
    pub index: Arc<IdentityIndex>,
    pub metrics: Arc<Metrics>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_dry_run(false)
    }

    pub fn with_dry_run(dry_run: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        let db = dir.path().join("index.db");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        let (config, index) = open(&src, &dst, &db, dry_run);
        Self {
            dir,
            src,
            dst,
            db,
            config,
            index,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Close the index and open it again, possibly switching dry-run.
    pub fn reopen(self, dry_run: bool) -> Self {
        let Fixture {
            dir,
            src,
            dst,
            db,
            config,
            index,
            metrics,
        } = self;
        drop(index);
        drop(config);
        let (config, index) = open(&src, &dst, &db, dry_run);
        Self {
            dir,
            src,
            dst,
            db,
            config,
            index,
            metrics,
        }
    }

    pub fn pipeline(&self, mode: PipelineMode) -> Pipeline {
        Pipeline::new(
            mode,
            Arc::clone(&self.config),
            Arc::clone(&self.index),
            Arc::clone(&self.metrics),
        )
    }
}

fn open(src: &Path, dst: &Path, db: &Path, dry_run: bool) -> (Arc<AppConfig>, Arc<IdentityIndex>) {
    let mut config = AppConfig::new(src, dst, db);
    config.dry_run = dry_run;
    let index = IdentityIndex::open(db).unwrap().with_dry_run(dry_run);
    (Arc::new(config), Arc::new(index))
}
