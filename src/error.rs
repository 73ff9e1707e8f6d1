//! Error types for hdcont operations.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while reading an HD container.
///
/// Problems with individual metadata entries or image payloads are not
/// errors; they are reported inline and the dump continues.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file format: {0}")]
    NotAContainer(String),

    #[error("{} must be a Kindle AZW6 HD container file (.azw6 or .res)", .0.display())]
    NotAContainerFile(PathBuf),

    #[error("{what} truncated: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("record index {index} out of range (container has {count} records)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("corrupt record table: record {index} spans {start}..{end} in a {len} byte file")]
    CorruptRecordTable {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
