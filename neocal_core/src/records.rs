//! Calculation record store.
//!
//! Records are appended to a JSONL (JSON Lines) file with file locking so
//! a calculation and a reconciliation pass can run at the same time.
//! Appends and the sync-flag rewrite take an exclusive lock; reads take a
//! shared one.

use crate::{CalculationRecord, Error, RecordId, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Persistence sink for calculation records
pub trait RecordSink {
    /// Append a record. Records are never overwritten.
    fn save_record(&mut self, record: &CalculationRecord) -> Result<RecordId>;

    /// All readable records, oldest first
    fn list_records(&self) -> Result<Vec<CalculationRecord>>;

    /// Clear `needs_sync` on a record. Returns false if no such record.
    fn mark_synced(&mut self, id: RecordId) -> Result<bool>;
}

/// JSONL-backed record store
pub struct JsonlRecordStore {
    path: PathBuf,
}

impl JsonlRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl RecordSink for JsonlRecordStore {
    fn save_record(&mut self, record: &CalculationRecord) -> Result<RecordId> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended record {} to {:?}", record.id, self.path);
        Ok(record.id)
    }

    fn list_records(&self) -> Result<Vec<CalculationRecord>> {
        read_records(&self.path)
    }

    fn mark_synced(&mut self, id: RecordId) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let mut found = false;
        let mut rewritten = String::with_capacity(contents.len());
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // Unreadable lines are carried over untouched
            match serde_json::from_str::<CalculationRecord>(line) {
                Ok(mut record) if record.id == id => {
                    found = true;
                    record.needs_sync = false;
                    rewritten.push_str(&serde_json::to_string(&record)?);
                }
                _ => rewritten.push_str(line),
            }
            rewritten.push('\n');
        }

        // Overwrite first, then cut any stale tail. The file is never
        // empty on disk, so an interrupted rewrite costs at most one torn
        // line, which readers skip.
        if found {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(rewritten.as_bytes())?;
            file.set_len(rewritten.len() as u64)?;
            file.sync_all()?;
            tracing::debug!("Marked record {} as synced", id);
        }

        file.unlock()?;
        Ok(found)
    }
}

/// Read all records from a JSONL file, skipping lines that fail to parse
pub fn read_records(path: &Path) -> Result<Vec<CalculationRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<CalculationRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse record at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

/// Mark every record produced offline as synced.
///
/// Returns how many records were flipped. A failure on one record is
/// logged and does not stop the pass.
pub fn reconcile_pending(sink: &mut dyn RecordSink) -> Result<usize> {
    let pending: Vec<RecordId> = sink
        .list_records()?
        .into_iter()
        .filter(|r| r.needs_sync)
        .map(|r| r.id)
        .collect();

    if pending.is_empty() {
        tracing::info!("No offline records to reconcile");
        return Ok(0);
    }

    let mut synced = 0;
    let mut failures = 0;
    for id in pending {
        match sink.mark_synced(id) {
            Ok(true) => synced += 1,
            Ok(false) => tracing::warn!("Record {} disappeared during reconciliation", id),
            Err(e) => {
                failures += 1;
                tracing::warn!("Failed to mark record {} as synced: {}", id, e);
            }
        }
    }

    if synced == 0 && failures > 0 {
        return Err(Error::Persistence(format!(
            "reconciliation failed for all {} pending records",
            failures
        )));
    }

    tracing::info!("Reconciled {} offline records", synced);
    Ok(synced)
}
