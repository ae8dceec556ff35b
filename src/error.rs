//! Crate-wide error taxonomy.

use std::io;

use thiserror::Error;

/// Everything that can go wrong while loading data files or driving the
/// search.
///
/// All errors are fatal to the call that produced them; nothing is retried
/// and no partial results are returned. An empty result from the placement
/// enumerators is *not* an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A data file could not be read or written.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// A pieces, kicks, or catalog file is malformed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A queue string contains a character outside the seven-shape alphabet.
    #[error("unknown shape character {0:?}")]
    UnknownShape(char),

    /// A queue is longer than the packed representation supports.
    #[error("queue of {0} pieces exceeds the supported maximum of 21")]
    QueueTooLong(usize),

    /// A height bound would overflow the 16-row board representation.
    #[error("height bound {0} exceeds the supported maximum of 12 rows")]
    HeightTooLarge(u8),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Error {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
