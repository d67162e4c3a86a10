use std::{io, path::PathBuf};

use thiserror::Error;

/// A list of possible errors returned by PageScope.
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened or mapped.
    #[error("Open {}: {source}", path.display())]
    Open {
        /// The path passed to `open`.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: io::Error,
    },
    /// The page index is outside `[0, count)`.
    #[error("Page index {index} out of range, page count {count}")]
    IndexOutOfRange {
        /// The requested index.
        index: u64,
        /// The number of pages of the source.
        count: u64,
    },
    /// The page source has been closed.
    #[error("Page source has been closed")]
    UseAfterDispose,
    /// A page could not be read.
    #[error("IO {0}")]
    Io(#[from] io::Error),
    /// Some option is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The page load was cancelled.
    #[error("Cancelled")]
    Cancelled,
}

/// A specialized [`Result`] type returned by PageScope.
pub type Result<T, E = Error> = std::result::Result<T, E>;
