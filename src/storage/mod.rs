//! Persistent sample storage.
//!
//! Records are flat fixed-width binary, written back to back with no header;
//! readers (download tools, post-flight analysis) know the record width and
//! count out of band. The backing volume only needs to support writes at an
//! offset - the filesystem underneath is the host's business.

mod sample_log;

pub use sample_log::{LogMode, Record, SampleLog, StorageError};
