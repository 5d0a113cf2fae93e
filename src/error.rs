//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout datkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every variant is fatal for the file being decoded. Unknown opcodes and
/// unknown root node types are not errors: they decode to raw events and
/// [`NodeData::Unknown`](crate::formats::dat::NodeData::Unknown) respectively.
#[derive(Debug)]
pub enum Error {
    /// A structurally required region extends past the end of its buffer.
    TruncatedInput,
    /// An offset or size field cannot describe a region of the buffer.
    InvalidRange,
    /// A `goto` target at `offset` never reaches a `return` event.
    MalformedControlFlow { offset: u32 },
    /// The attribute blob is shorter than the static attribute schema.
    SchemaMismatch { expected: usize, actual: usize },
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TruncatedInput => write!(f, "truncated input"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::MalformedControlFlow { offset } => {
                write!(f, "goto target {offset:#x} never returns")
            }
            Error::SchemaMismatch { expected, actual } => write!(
                f,
                "attribute blob is {actual} bytes, schema needs {expected}"
            ),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        // Reads over in-memory cursors only fail by running off the end.
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::TruncatedInput
        } else {
            Error::Io(e)
        }
    }
}
