//  The identity of a table, and of the strings within.

use core::{
    fmt,
    num::NonZeroU32,
    sync::atomic::{AtomicU32, Ordering},
};

use crate::error::TableError;

/// A `TableId` uniquely identifies a `Table`, unless `new_unchecked` is used to create it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TableId(NonZeroU32);

impl TableId {
    /// Creates a new instance, with a guaranteed fresh new ID.
    ///
    /// Only 2^32 - 1 instances can be created by this method during the lifetime of the process, after which it fails
    /// unconditionally.
    pub fn new() -> Result<Self, TableError> {
        static ID_POOL: AtomicU32 = AtomicU32::new(0);

        let mut current = ID_POOL.load(Ordering::Relaxed);

        loop {
            if current == u32::MAX {
                return Err(TableError::TableIdPoolExhausted);
            }

            let result = ID_POOL.compare_exchange_weak(current, current + 1, Ordering::Relaxed, Ordering::Relaxed);

            if let Err(new_current) = result {
                current = new_current;
                continue;
            }

            //  Safety:
            //  -   `current + 1 > 0`.
            let id = unsafe { NonZeroU32::new_unchecked(current + 1) };

            return Ok(Self(id));
        }
    }

    /// Creates a new instance with the specified ID.
    ///
    /// This instance can then be used to create a `Table` using the `set_id` method of its builder, at the risk and
    /// perils of the caller.
    pub fn new_unchecked(n: NonZeroU32) -> Self {
        Self(n)
    }

    /// Returns the raw value.
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

/// A `StringId` is the dense, zero-based, identifier of a string within a `Table`.
///
/// Identifiers are assigned in strict creation order; `StringId::EMPTY` is reserved for the empty string, which is
/// always the first string of any `Table`.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StringId(u32);

impl StringId {
    /// The identifier of the empty string.
    pub const EMPTY: StringId = StringId(0);

    /// Creates an identifier from its raw value.
    ///
    /// The identifier is only meaningful for the `Table` which assigned it.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns whether this is the identifier of the empty string.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    //  Returns the index within the identifier sequence.
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "StringId({})", self.0)
    }
}

impl From<StringId> for u32 {
    fn from(id: StringId) -> u32 {
        id.0
    }
}

// mod tests
