//  Implementation of the `Table`.

use core::{fmt, hash::BuildHasher};

use fxhash::FxBuildHasher;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{
    chunk::{DEFAULT_CHUNK_SIZE, ID_WIDTH, MAX_CHUNK_SIZE},
    error::TableError,
    handle::{Handle, Symbol},
    id::{StringId, TableId},
    registry::{self, Registry},
};

/// A concurrent string table.
///
/// Each unique string is stored once, in append-only chunks, and identified by a dense `StringId`. Strings are never
/// removed: the table only grows, until dropped.
///
/// The table is meant to be shared between threads by reference; all operations take `&self`.
pub struct Table<H = FxBuildHasher> {
    id: TableId,
    hasher: H,
    registry: RwLock<Registry>,
}

impl Table {
    /// Creates a new Table, with default configuration.
    ///
    /// This may only fail if the pool of `TableId` is exhausted.
    ///
    /// To customize the Table, use the `builder()` or `with_hasher()` methods instead.
    pub fn new() -> Result<Self, TableError> {
        Self::builder().build()
    }

    /// Creates a builder for the Table, with the default hasher.
    pub fn builder() -> TableBuilder<FxBuildHasher> {
        Self::with_hasher(FxBuildHasher::default())
    }
}

impl<H> Table<H> {
    /// Creates a builder for the Table, allowing finer-grained tuning.
    pub fn with_hasher(hasher: H) -> TableBuilder<H> {
        TableBuilder {
            id: None,
            hasher,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_strings: u32::MAX,
            initial_capacity: 0,
        }
    }

    /// Returns the identity of this table.
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Returns the number of unique strings, the empty string included.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns the bytes of the string identified by `id`, if any.
    ///
    /// Returns `None` if `id` was never assigned by this table.
    ///
    /// #   Complexity
    ///
    /// O(1) in time and space, under a shared lock.
    pub fn resolve(&self, id: StringId) -> Option<&[u8]> {
        let entry = self.registry.read().get(id)?;

        //  Safety:
        //  -   Chunks are only released when `self` is dropped, and `self` is borrowed for the lifetime of the result.
        Some(unsafe { entry.as_bytes() })
    }

    /// Returns the bytes of the string identified by `id`, NUL terminator included, if any.
    pub fn resolve_with_nul(&self, id: StringId) -> Option<&[u8]> {
        let entry = self.registry.read().get(id)?;

        //  Safety:
        //  -   Chunks are only released when `self` is dropped, and `self` is borrowed for the lifetime of the result.
        Some(unsafe { entry.as_bytes_with_nul() })
    }

    /// Re-attaches a detached `Symbol` to this table.
    ///
    /// Returns an error if the `symbol` is NOT from this instance.
    pub fn attach(&self, symbol: Symbol) -> Result<Handle<'_, H>, TableError> {
        if symbol.table_id() != self.id {
            return Err(TableError::TableMismatch);
        }

        let id = symbol.id();

        if id.index() >= self.len() {
            return Err(TableError::UnknownId(id.get()));
        }

        Ok(Handle::new(self, id))
    }

    /// Returns a snapshot of the usage statistics.
    pub fn stats(&self) -> TableStats {
        let registry = self.registry.read();
        let chunks = registry.chunks();

        TableStats {
            strings: registry.len(),
            chunks: chunks.len(),
            bytes_used: chunks.iter().map(|chunk| chunk.len() as usize).sum(),
            bytes_reserved: chunks.iter().map(|chunk| chunk.capacity() as usize).sum(),
        }
    }
}

impl<H> Table<H>
where
    H: BuildHasher,
{
    /// Looks up a string, without inserting it.
    ///
    /// Returns a default, invalid, `Handle` if the string is absent.
    ///
    /// #   Complexity
    ///
    /// O(bytes.len()) in time, under a shared lock.
    pub fn find(&self, bytes: impl AsRef<[u8]>) -> Handle<'_, H> {
        let bytes = bytes.as_ref();
        let hash = registry::hash_bytes(&self.hasher, bytes);

        match self.registry.read().find(hash, bytes) {
            Some(id) => Handle::new(self, id),
            None => Handle::default(),
        }
    }

    /// Gets the handle of a string, inserting it first if necessary.
    ///
    /// Returns a default, invalid, `Handle` if the insertion fails; use `try_get` to learn why.
    pub fn get(&self, bytes: impl AsRef<[u8]>) -> Handle<'_, H> {
        self.try_get(bytes).unwrap_or_default()
    }

    /// Gets the handle of a string, inserting it first if necessary.
    ///
    /// Insertion fails, leaving the table untouched, if:
    ///
    /// -   The string, NUL terminator and padding included, does not fit in a single chunk.
    /// -   The table already holds its maximum number of unique strings.
    ///
    /// #   Complexity
    ///
    /// O(bytes.len()) in time, under a shared lock if the string is already present, and under an exclusive lock
    /// otherwise.
    pub fn try_get(&self, bytes: impl AsRef<[u8]>) -> Result<Handle<'_, H>, TableError> {
        let bytes = bytes.as_ref();
        let hash = registry::hash_bytes(&self.hasher, bytes);

        if let Some(id) = self.registry.read().find(hash, bytes) {
            return Ok(Handle::new(self, id));
        }

        let mut registry = self.registry.write();

        //  Another thread may have inserted the same string in between the two critical sections.
        if let Some(id) = registry.find(hash, bytes) {
            return Ok(Handle::new(self, id));
        }

        match registry.insert(hash, bytes, &self.hasher) {
            Ok(id) => {
                let chunk = registry.chunks().len() - 1;

                trace!(table = self.id.get(), id = id.get(), length = bytes.len(), chunk, "inserted");

                Ok(Handle::new(self, id))
            }
            Err(error) => {
                debug!(table = self.id.get(), length = bytes.len(), %error, "insertion rejected");

                Err(error)
            }
        }
    }
}

impl<H> fmt::Debug for Table<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let registry = self.registry.read();

        write!(f, "{{ id: {:?}, chunks: {}, strings: [", self.id, registry.chunks().len())?;

        for (index, (id, entry)) in registry.iter().enumerate() {
            let separator = if index > 0 { ", " } else { "" };

            //  Safety:
            //  -   `registry` borrows `self`, which owns the chunks.
            let bytes = unsafe { entry.as_bytes() };

            write!(f, "{separator}{} -> ", id.get())?;

            if let Ok(string) = core::str::from_utf8(bytes) {
                write!(f, "{string:?}")?;
            } else {
                write!(f, "{bytes:x?}")?;
            }
        }

        write!(f, "] }}")
    }
}

/// A snapshot of the usage statistics of a `Table`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TableStats {
    /// Number of unique strings, the empty string included.
    pub strings: usize,
    /// Number of chunks allocated.
    pub chunks: usize,
    /// Number of bytes committed within the chunks, terminators and padding included.
    pub bytes_used: usize,
    /// Number of bytes allocated for the chunks.
    pub bytes_reserved: usize,
}

/// A builder for the Table.
pub struct TableBuilder<H> {
    id: Option<TableId>,
    hasher: H,
    chunk_size: u32,
    max_strings: u32,
    initial_capacity: usize,
}

impl<H> TableBuilder<H> {
    /// Sets the ID with which to build the Table.
    ///
    /// #   Safety
    ///
    /// The ID is used to tie a `Symbol` to its matching `Table`, the user should ensure that no `Symbol` with this
    /// `id` from another `Table` is ever used with this instance.
    pub unsafe fn set_id(&mut self, id: TableId) -> &mut Self {
        self.id = Some(id);
        self
    }

    /// Sets the size of a chunk, in bytes.
    ///
    /// The largest string which can be stored is `chunk_size - 5` bytes long: the last 4 bytes of a chunk are
    /// reserved, and each string is NUL terminated.
    ///
    /// #   Panics
    ///
    /// If `chunk_size` is not a multiple of 4, is less than 8, or exceeds `MAX_CHUNK_SIZE`.
    pub fn set_chunk_size(&mut self, chunk_size: u32) -> &mut Self {
        assert_eq!(0, chunk_size % ID_WIDTH);
        assert!(chunk_size >= 2 * ID_WIDTH);
        assert!(chunk_size <= MAX_CHUNK_SIZE);

        self.chunk_size = chunk_size;
        self
    }

    /// Sets the maximum number of unique strings, the empty string included.
    ///
    /// #   Panics
    ///
    /// If `max_strings` is 0, as the empty string is always present.
    pub fn set_max_strings(&mut self, max_strings: u32) -> &mut Self {
        assert!(max_strings > 0);

        self.max_strings = max_strings;
        self
    }

    /// Sets the number of strings to reserve room for, in the identifier sequence and content map.
    ///
    /// Chunks are still allocated on demand.
    pub fn set_initial_capacity(&mut self, capacity: usize) -> &mut Self {
        self.initial_capacity = capacity;
        self
    }
}

impl<H> TableBuilder<H>
where
    H: BuildHasher,
{
    /// Attempts to build a Table with the current configuration.
    ///
    /// This may only fail if no ID was specified, and the pool of IDs is exhausted.
    pub fn build(self) -> Result<Table<H>, TableError> {
        let id = if let Some(id) = self.id {
            id
        } else {
            TableId::new()?
        };

        let mut registry = Registry::new(self.chunk_size, self.max_strings, self.initial_capacity);

        //  Always insert the empty string first, so it gets `StringId::EMPTY`.
        let empty = registry.insert(registry::hash_bytes(&self.hasher, b""), b"", &self.hasher)?;

        debug_assert_eq!(StringId::EMPTY, empty);

        Ok(Table {
            id,
            hasher: self.hasher,
            registry: RwLock::new(registry),
        })
    }
}

impl<H> fmt::Debug for TableBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("TableBuilder")
            .field("id", &self.id)
            .field("chunk_size", &self.chunk_size)
            .field("max_strings", &self.max_strings)
            .field("initial_capacity", &self.initial_capacity)
            .finish()
    }
}

#[doc(hidden)]
pub mod compile_tests {

    //  Bad enough it needs to be `pub`, there's really no sense in exposing it any further.
    #![allow(dead_code)]

    /// ```compile_fail,E0277
    /// fn ensure_sync<T: Sync>() {}
    ///
    /// #[derive(Default)]
    /// struct NoSyncH(std::cell::Cell<u32>);
    ///
    /// ensure_sync::<endor_string_table::Table<NoSyncH>>();
    /// ```
    pub fn table_not_sync_if_hasher_not_sync() {}

    /// ```compile_fail,E0505
    /// let table = endor_string_table::Table::new().unwrap();
    ///
    /// let handle = table.get("hello");
    ///
    /// drop(table);
    ///
    /// let _ = handle.resolve();
    /// ```
    pub fn handle_cannot_outlive_table() {}
} // mod compile_tests

// mod tests
