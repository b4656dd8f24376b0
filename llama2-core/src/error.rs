use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds surfaced while loading a checkpoint.
///
/// None of these are recovered from: the first one aborts the build that
/// produced it and no partially loaded model is handed back to the caller.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source ended before a fixed-size read completed.
    #[error("truncated checkpoint: {what} needs {needed} bytes")]
    TruncatedInput {
        what: &'static str,
        needed: usize,
        #[source]
        source: io::Error,
    },

    /// A chunk transfer returned fewer bytes than requested. A short chunk
    /// is always fatal, never padded.
    #[error("short read in {tensor} at byte {offset}: requested {requested} bytes")]
    ShortRead {
        tensor: &'static str,
        offset: u64,
        requested: usize,
        #[source]
        source: io::Error,
    },

    /// A buffer allocation failed.
    #[error("failed to allocate {elements} elements for {what}")]
    AllocationFailure {
        what: &'static str,
        elements: usize,
        #[source]
        source: TryReserveError,
    },

    /// The checkpoint file could not be opened for reading.
    #[error("couldn't open checkpoint {}", .path.display())]
    SourceOpenFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
