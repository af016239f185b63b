//! Bounded fixed-width sample logs.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from sample log operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A fill-once log reached capacity. Terminal for this log: the data
    /// already written is preserved and further writes keep failing.
    #[error("log is at capacity")]
    OutOfSpace,
    /// The slot has never been written since the log was created.
    #[error("slot {0} has not been written")]
    InvalidSlot(usize),
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Wrap policy of a sample log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogMode {
    /// Stop at capacity: the write after the final slot fails with
    /// [`StorageError::OutOfSpace`], freezing the volume. Used for
    /// last-flight forensic logs that must never be overwritten.
    FillOnce,
    /// Wrap at capacity: the write after the final slot lands in slot 0,
    /// silently overwriting the oldest record. Used for low-value, high-rate
    /// pre-launch telemetry where only the most recent window matters.
    Circular,
    /// Append without bound. Used for streams whose length is not known
    /// ahead of time.
    Growing,
}

/// A fixed-width binary record.
///
/// `encode` and `decode` work on exactly [`WIDTH`](Self::WIDTH) bytes; the
/// log guarantees the slice size on both paths.
pub trait Record: Sized {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Encodes into `buf`.
    fn encode(&self, buf: &mut [u8]);

    /// Decodes from `buf`.
    fn decode(buf: &[u8]) -> Self;
}

/// Append-only log of fixed-width records over a backing volume path.
///
/// The write offset is always a record-width multiple inside the slot range.
/// All operations are synchronous; callers that must not block put the log
/// behind a channel and a draining unit
/// ([`LogSinkUnit`](crate::telemetry::LogSinkUnit)). A log has exactly one
/// owning unit - there is no concurrent-writer support.
pub struct SampleLog<R: Record> {
    path: PathBuf,
    file: File,
    mode: LogMode,
    capacity: usize,
    write_slot: usize,
    written: usize,
    scratch: Vec<u8>,
    _record: PhantomData<R>,
}

impl<R: Record> SampleLog<R> {
    /// Creates a stop-at-capacity log of `capacity` records at `path`,
    /// resetting any previous content.
    pub fn fill_once(path: &Path, capacity: usize) -> Result<Self, StorageError> {
        Self::create(path, capacity, LogMode::FillOnce)
    }

    /// Creates a wrap-at-capacity log of `capacity` records at `path`,
    /// resetting any previous content.
    pub fn circular(path: &Path, capacity: usize) -> Result<Self, StorageError> {
        Self::create(path, capacity, LogMode::Circular)
    }

    /// Creates an unbounded append log at `path`, resetting any previous
    /// content.
    pub fn growing(path: &Path) -> Result<Self, StorageError> {
        Self::create(path, 0, LogMode::Growing)
    }

    fn create(path: &Path, capacity: usize, mode: LogMode) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            mode,
            capacity,
            write_slot: 0,
            written: 0,
            scratch: vec![0u8; R::WIDTH],
            _record: PhantomData,
        })
    }

    /// Appends one record at the current offset and advances it.
    ///
    /// In `FillOnce` mode the write after the final slot fails with
    /// [`StorageError::OutOfSpace`]; in `Circular` mode the offset wraps to
    /// slot 0 instead.
    pub fn write(&mut self, record: &R) -> Result<(), StorageError> {
        if self.mode == LogMode::FillOnce && self.write_slot >= self.capacity {
            return Err(StorageError::OutOfSpace);
        }

        record.encode(&mut self.scratch);
        let offset = (self.write_slot * R::WIDTH) as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&self.scratch)?;

        self.written += 1;
        self.write_slot += 1;
        if self.mode == LogMode::Circular && self.write_slot == self.capacity {
            self.write_slot = 0;
        }
        Ok(())
    }

    /// Reads back the record in logical `slot`. Only slots written at least
    /// once since the log was created are valid.
    pub fn read(&mut self, slot: usize) -> Result<R, StorageError> {
        if slot >= self.record_count() {
            return Err(StorageError::InvalidSlot(slot));
        }
        let offset = (slot * R::WIDTH) as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut self.scratch)?;
        Ok(R::decode(&self.scratch))
    }

    /// Remaining record slots. `Circular` reports full capacity at all times
    /// (wrapping never fills); `Growing` is unbounded and reports `None`.
    pub fn free_slots(&self) -> Option<usize> {
        match self.mode {
            LogMode::FillOnce => Some(self.capacity - self.write_slot),
            LogMode::Circular => Some(self.capacity),
            LogMode::Growing => None,
        }
    }

    /// Number of live records (valid read slots).
    pub fn record_count(&self) -> usize {
        match self.mode {
            LogMode::Circular => self.written.min(self.capacity),
            LogMode::FillOnce | LogMode::Growing => self.written,
        }
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pushes buffered data to the volume.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Minimal fixed-width record for storage tests.
    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Sample {
        seq: u32,
        value: f32,
    }

    impl Record for Sample {
        const WIDTH: usize = 8;

        fn encode(&self, buf: &mut [u8]) {
            buf[0..4].copy_from_slice(&self.seq.to_le_bytes());
            buf[4..8].copy_from_slice(&self.value.to_le_bytes());
        }

        fn decode(buf: &[u8]) -> Self {
            Self {
                seq: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
                value: f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            }
        }
    }

    fn sample(seq: u32) -> Sample {
        Sample {
            seq,
            value: seq as f32 * 0.5,
        }
    }

    #[test]
    fn fill_once_freezes_at_capacity() {
        let dir = tempdir().expect("tempdir");
        let mut log = SampleLog::fill_once(&dir.path().join("flight.bin"), 3).expect("create");

        for seq in 0..3 {
            log.write(&sample(seq)).expect("slot available");
        }
        assert!(matches!(
            log.write(&sample(99)),
            Err(StorageError::OutOfSpace)
        ));
        // Repeated writes keep failing; the log stays frozen.
        assert!(matches!(
            log.write(&sample(100)),
            Err(StorageError::OutOfSpace)
        ));

        // The original three records survive the failed writes.
        for seq in 0..3 {
            assert_eq!(log.read(seq as usize).expect("written slot"), sample(seq));
        }
        assert_eq!(log.free_slots(), Some(0));
    }

    #[test]
    fn fill_once_reports_free_slots() {
        let dir = tempdir().expect("tempdir");
        let mut log = SampleLog::fill_once(&dir.path().join("flight.bin"), 4).expect("create");
        assert_eq!(log.free_slots(), Some(4));
        log.write(&sample(0)).expect("slot available");
        assert_eq!(log.free_slots(), Some(3));
    }

    #[test]
    fn circular_wraps_to_slot_zero() {
        let dir = tempdir().expect("tempdir");
        let mut log = SampleLog::circular(&dir.path().join("idle.bin"), 3).expect("create");

        for seq in 1..=4 {
            log.write(&sample(seq)).expect("circular never fills");
            assert_eq!(log.free_slots(), Some(3));
        }

        // Slot 0 holds the 4th record; slots 1-2 hold records 2 and 3.
        assert_eq!(log.read(0).expect("written"), sample(4));
        assert_eq!(log.read(1).expect("written"), sample(2));
        assert_eq!(log.read(2).expect("written"), sample(3));
        assert_eq!(log.record_count(), 3);
    }

    #[test]
    fn growing_appends_without_bound() {
        let dir = tempdir().expect("tempdir");
        let mut log = SampleLog::growing(&dir.path().join("stream.bin")).expect("create");
        assert_eq!(log.free_slots(), None);

        for seq in 0..10 {
            log.write(&sample(seq)).expect("growing never fills");
        }
        assert_eq!(log.record_count(), 10);
        assert_eq!(log.read(9).expect("written"), sample(9));
    }

    #[test]
    fn unwritten_slots_are_invalid() {
        let dir = tempdir().expect("tempdir");
        let mut log = SampleLog::fill_once(&dir.path().join("flight.bin"), 8).expect("create");
        log.write(&sample(0)).expect("slot available");

        assert!(matches!(log.read(1), Err(StorageError::InvalidSlot(1))));
        assert!(matches!(log.read(7), Err(StorageError::InvalidSlot(7))));

        // Circular before wrapping: only the written prefix is valid.
        let mut idle = SampleLog::circular(&dir.path().join("idle.bin"), 4).expect("create");
        idle.write(&sample(1)).expect("slot available");
        idle.write(&sample(2)).expect("slot available");
        assert!(matches!(idle.read(2), Err(StorageError::InvalidSlot(2))));
    }

    #[test]
    fn create_resets_previous_content() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("flight.bin");

        let mut log = SampleLog::fill_once(&path, 4).expect("create");
        log.write(&sample(7)).expect("slot available");
        log.flush().expect("flush");
        drop(log);

        let mut log = SampleLog::<Sample>::fill_once(&path, 4).expect("recreate");
        assert_eq!(log.record_count(), 0);
        assert!(matches!(log.read(0), Err(StorageError::InvalidSlot(0))));
        assert_eq!(log.free_slots(), Some(4));
    }

    #[test]
    fn records_land_at_width_multiples() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("layout.bin");
        let mut log = SampleLog::fill_once(&path, 4).expect("create");
        for seq in 0..3 {
            log.write(&sample(seq)).expect("slot available");
        }
        log.flush().expect("flush");

        let raw = std::fs::read(&path).expect("read backing file");
        assert_eq!(raw.len(), 3 * Sample::WIDTH);
        let second = Sample::decode(&raw[Sample::WIDTH..2 * Sample::WIDTH]);
        assert_eq!(second, sample(1));
    }
}
