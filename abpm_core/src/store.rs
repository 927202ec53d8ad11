//! On-disk store of pulled ABPM tests.
//!
//! Each test is kept as `<dir>/<id>.json`. Files are written atomically
//! (temp file, fsync, rename) so an interrupted pull never leaves a
//! truncated record behind, and the largest stored id tells the puller
//! where to resume.

use crate::{AbpmRecord, Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Destination for pulled records
pub trait RecordSink {
    fn save(&mut self, record: &AbpmRecord) -> Result<()>;
}

/// Directory of `<id>.json` files
pub struct JsonRecordStore {
    dir: PathBuf,
}

impl JsonRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding the given test
    pub fn record_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl RecordSink for JsonRecordStore {
    fn save(&mut self, record: &AbpmRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, record)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        let path = self.record_path(record.id);
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved record {} to {:?}", record.id, path);
        Ok(())
    }
}

/// Test id encoded in a `<id>.json` file name
fn record_id(path: &Path) -> Option<u64> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Largest test id stored in `dir` (0 when there are none)
pub fn max_record_id(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut max = 0;
    for entry in std::fs::read_dir(dir)? {
        if let Some(id) = record_id(&entry?.path()) {
            max = max.max(id);
        }
    }
    Ok(max)
}

/// Read one stored record
pub fn read_record(path: &Path) -> Result<AbpmRecord> {
    let file = File::open(path)?;
    file.lock_shared()?;
    let record = serde_json::from_reader(BufReader::new(&file));
    file.unlock()?;
    Ok(record?)
}

/// Read every record in `dir`, ordered by id
///
/// Unreadable files are skipped with a warning.
pub fn read_records(dir: &Path) -> Result<Vec<AbpmRecord>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<(u64, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(id) = record_id(&path) {
            paths.push((id, path));
        }
    }
    paths.sort_by_key(|(id, _)| *id);

    let mut records = Vec::with_capacity(paths.len());
    for (_, path) in paths {
        match read_record(&path) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to read record {:?}: {}", path, e);
            }
        }
    }

    tracing::debug!("Read {} records from {:?}", records.len(), dir);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reading;

    fn create_test_record(id: u64) -> AbpmRecord {
        AbpmRecord {
            id,
            data: vec![Reading {
                taken_at: Some("2019-03-01 10:00:00".into()),
                systolic: Some(125.0),
                diastolic: Some(82.0),
                heart_rate: Some(71.0),
                ..Default::default()
            }],
            meta_data: vec![],
            measure: serde_json::Value::Null,
            drugs: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_save_and_read_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonRecordStore::new(temp_dir.path().join("api-data"));

        store.save(&create_test_record(42)).unwrap();

        let path = store.record_path(42);
        assert!(path.exists());
        let record = read_record(&path).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.data[0].systolic, Some(125.0));
    }

    #[test]
    fn test_save_overwrites_without_stray_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonRecordStore::new(temp_dir.path());

        store.save(&create_test_record(1)).unwrap();
        store.save(&create_test_record(1)).unwrap();

        let files: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_max_record_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(max_record_id(&temp_dir.path().join("missing")).unwrap(), 0);

        let mut store = JsonRecordStore::new(temp_dir.path());
        for id in [3, 250, 17] {
            store.save(&create_test_record(id)).unwrap();
        }
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(temp_dir.path().join("9999.bak"), "x").unwrap();

        assert_eq!(max_record_id(temp_dir.path()).unwrap(), 250);
    }

    #[test]
    fn test_read_records_sorted_and_skips_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = JsonRecordStore::new(temp_dir.path());
        store.save(&create_test_record(20)).unwrap();
        store.save(&create_test_record(3)).unwrap();
        std::fs::write(temp_dir.path().join("7.json"), "{ invalid json }").unwrap();

        let records = read_records(temp_dir.path()).unwrap();
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 20]);
    }
}
