//! Errors from the library.

use thiserror::Error;

/// Errors returned by this library.
///
/// None of these errors leaves any partial state behind: validation always precedes the first byte written.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TableError {
    /// The entry, terminator and padding included, does not fit within a single chunk.
    #[error("string of {length} bytes requires {required} bytes of storage, exceeding the {capacity} bytes of a chunk")]
    StringTooLarge {
        /// Length of the string, in bytes.
        length: usize,
        /// Storage required, terminator and padding included; saturates at `u32::MAX`.
        required: u32,
        /// Usable capacity of a chunk.
        capacity: u32,
    },
    /// The table already holds its maximum number of unique strings.
    #[error("identifier space exhausted after {0} unique strings")]
    IdSpaceExhausted(u32),
    /// The `Symbol` is not from this instance of `Table`.
    #[error("symbol belongs to another table")]
    TableMismatch,
    /// The `StringId` was never assigned by this instance of `Table`.
    #[error("unknown string identifier {0}")]
    UnknownId(u32),
    /// The pool of `TableId` has been exhausted.
    #[error("table identity pool exhausted")]
    TableIdPoolExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_too_large() {
        let error = TableError::StringTooLarge {
            length: 4092,
            required: 4096,
            capacity: 4092,
        };

        assert_eq!(
            "string of 4092 bytes requires 4096 bytes of storage, exceeding the 4092 bytes of a chunk",
            error.to_string()
        );
    }

    #[test]
    fn display_exhausted() {
        assert_eq!(
            "identifier space exhausted after 3 unique strings",
            TableError::IdSpaceExhausted(3).to_string()
        );
    }
} // mod tests
