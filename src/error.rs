//! Error types for the threading library.

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur when building or sorting threads.
///
/// The threading algorithm itself is total over any well-formed message
/// sequence; errors only arise at the parsing boundary and from invalid
/// sort arguments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A raw mail record did not contain a usable Message-ID header.
    ///
    /// Raised by the parsing adapters only; callers are expected to skip
    /// or report the offending record.
    #[error("message does not contain a Message-ID header")]
    MissingMessageId,

    /// An unsupported key was passed to [`sort_threads`](crate::sort_threads).
    ///
    /// Valid keys are `"message_id"` and `"subject"`.
    #[error("invalid sort key `{0}`, expected `message_id` or `subject`")]
    InvalidSortKey(String),
}
