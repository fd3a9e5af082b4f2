//! Concurrent string table.
//!
//! The `Table` deduplicates byte strings, assigns each unique string a dense 32-bit identifier, and stores the bytes
//! exactly once in append-only fixed-size chunks. Clients exchange lightweight `Handle`s instead of copying string
//! content: equal handles imply equal content, and looking up content by identifier is O(1).
//!
//!
//! #   How to use?
//!
//! If you just want to get going, use the `new` method, and you'll get a default configured `Table` which will be
//! quite fine.
//!
//! ```
//! use endor_string_table::Table;
//!
//! let table = Table::new().unwrap();
//!
//! let hello = table.get("hello");
//!
//! assert!(hello.is_valid());
//! assert_eq!(Some(&b"hello"[..]), hello.resolve());
//! assert_eq!(hello, table.get("hello"));
//! assert!(!table.find("missing").is_valid());
//! ```
//!
//!
//! #   Configuration options
//!
//! The `Table` offers multiple configuration options, available via the `TableBuilder`:
//!
//! -   The hashing algorithm can be tuned, it defaults to Fx Hash.
//! -   The size of a chunk can be tuned, it defaults to 4096 bytes. It also bounds the size of the largest string.
//! -   The maximum number of unique strings can be lowered, it defaults to 2**32 - 1.
//! -   The initial capacity of the identifier sequence and content map can be reserved up-front.
//!
//!
//! #   Limits
//!
//! The `Table` has some hard limits, due to design constraints:
//!
//! -   It supports only strings which fit in a single chunk, terminator and padding included.
//! -   It supports only up to 4 billions unique strings, eg. 2**32 - 1.
//! -   It never releases a string, nor any chunk, until it is dropped.
//!
//!
//! #   Internals
//!
//! Each entry is stored as its bytes, followed by a NUL terminator, padded to a multiple of 4 bytes. An entry never
//! spans two chunks; when the current chunk lacks room, a fresh chunk is appended and the remainder of the previous one
//! is abandoned.
//!
//! A single reader-writer lock guards the chunks, the identifier sequence and the content map as one unit:
//!
//! -   Look-ups, by content or by identifier, take the lock in shared mode.
//! -   Insertions take the lock in exclusive mode, and check the content map again once the lock is acquired, so that
//!     racing first-time insertions of the same content agree on a single identifier.

//  Ensure unsafe operations are duly checked.
#![deny(unsafe_op_in_unsafe_fn)]
//  Ensure proper documentation.
#![deny(missing_docs)]

mod chunk;
mod error;
mod handle;
mod id;
mod registry;
mod table;

pub use chunk::{DEFAULT_CHUNK_SIZE, ID_WIDTH, MAX_CHUNK_SIZE};
pub use error::TableError;
pub use fxhash::FxBuildHasher;
pub use handle::{Handle, Symbol};
pub use id::{StringId, TableId};
pub use table::{Table, TableBuilder, TableStats};
