use std::time::Duration;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Broad category of an [`Error`].
///
/// Resolution treats every category as "not found" at the public entry points, the category only
/// decides how loudly the outcome is logged and whether a caller may want to retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A normal negative outcome: no debug info, no server has the file, no checksum matched,
    /// remote lookups disabled.
    Absence,
    /// Network or cache failures that were caught and downgraded.
    Infrastructure,
    /// Truncated or corrupt binary input. Treated exactly like a checksum mismatch.
    Malformed,
    /// The caller cancelled the operation.
    Cancelled,
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Binary Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the data
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::GoblinErr`] - PE parsing errors from goblin
/// - [`Error::StreamNotFound`] - The metadata root has no stream with the requested name
///
/// ## Resolution Outcomes
/// - [`Error::NotFound`] - Nothing could be resolved
/// - [`Error::RemoteDisabled`] - Cache miss while remote lookups are disabled
/// - [`Error::Cancelled`] - The caller cancelled the operation
///
/// ## I/O and Network Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Transport`] - HTTP transport failures from reqwest
/// - [`Error::Timeout`] - A request exceeded its time budget
/// - [`Error::InvalidPath`] - A cache key that does not map to a path below the cache root
/// - [`Error::InvalidUrl`] - A server base or document url that could not be parsed
///
/// Use [`Error::kind`] to map a variant onto the absence / infrastructure / malformed taxonomy.
///
/// # Examples
///
/// ```rust,no_run
/// use dotsym::{DebugDirectory, Error};
/// use std::path::Path;
///
/// match DebugDirectory::from_path(Path::new("MyApp.dll")) {
///     Ok(debug) => println!("{} checksum entries", debug.checksums.len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for debugging
    /// purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the data.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The metadata root does not list a stream with this name.
    #[error("Stream not found - {0}")]
    StreamNotFound(&'static str),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Nothing could be resolved for the request.
    ///
    /// Carries a short description of what was looked for.
    #[error("Not found - {0}")]
    NotFound(String),

    /// The cache did not hold the file and remote lookups were not allowed.
    #[error("Not cached and remote symbol servers are disabled - {0}")]
    RemoteDisabled(String),

    /// The HTTP transport failed (connection refused, TLS, body read, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// A single request did not complete within its budget.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// A cache key that would escape the cache root or is otherwise not a plain relative path.
    #[error("Invalid cache path - {0}")]
    InvalidPath(String),

    /// A url could not be parsed or joined.
    #[error("{0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A Source Link document could not be deserialized.
    #[error("{0}")]
    SourceLink(#[from] serde_json::Error),

    /// The operation was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) | Error::RemoteDisabled(_) | Error::StreamNotFound(_) => {
                ErrorKind::Absence
            }
            Error::Malformed { .. }
            | Error::OutOfBounds
            | Error::Empty
            | Error::GoblinErr(_)
            | Error::SourceLink(_) => ErrorKind::Malformed,
            Error::FileError(_)
            | Error::Error(_)
            | Error::Transport(_)
            | Error::Timeout(_)
            | Error::InvalidPath(_)
            | Error::InvalidUrl(_) => ErrorKind::Infrastructure,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_macro_captures_location() {
        let error = malformed_error!("bad header - {}", 42);
        match error {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad header - 42");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            _ => panic!("Expected Malformed variant"),
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(
            Error::NotFound("foo.pdb".to_string()).kind(),
            ErrorKind::Absence
        );
        assert_eq!(Error::StreamNotFound("#Pdb").kind(), ErrorKind::Absence);
        assert_eq!(Error::OutOfBounds.kind(), ErrorKind::Malformed);
        assert_eq!(
            Error::Timeout(Duration::from_secs(1)).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(
            Error::FileError(std::io::Error::other("disk full")).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
