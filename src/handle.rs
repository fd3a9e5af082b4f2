//  The handles of a string.

use core::{
    ffi::CStr,
    fmt,
    hash::{Hash, Hasher},
    ptr,
};

use fxhash::FxBuildHasher;

use crate::{
    id::{StringId, TableId},
    table::Table,
};

/// A `Handle` references an interned string, without owning it.
///
/// #   Tied to the `Table` instance.
///
/// A `Handle` borrows the `Table` which created it, and thus cannot outlive it.
///
/// #   Validity
///
/// A `Handle` is valid if it designates a non-empty string. Both a default constructed `Handle`, as returned on a
/// failed look-up or insertion, and the `Handle` of the empty string are invalid: they represent "no" content. Only
/// the former is null, though, and resolves to nothing.
pub struct Handle<'t, H = FxBuildHasher> {
    table: Option<&'t Table<H>>,
    id: StringId,
}

//  Public methods
impl<'t, H> Handle<'t, H> {
    /// Returns whether this handle designates a non-empty string.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }

    /// Returns whether this handle was default constructed, and therefore designates nothing at all.
    pub fn is_null(&self) -> bool {
        self.table.is_none()
    }

    /// Returns the identifier of the string.
    pub fn id(&self) -> StringId {
        self.id
    }

    /// Returns the `TableId` of the `Table` which created this instance, unless null.
    pub fn table_id(&self) -> Option<TableId> {
        self.table.map(Table::id)
    }

    /// Returns a detached, lifetime-free, form of this handle, unless null.
    pub fn symbol(&self) -> Option<Symbol> {
        self.table.map(|table| Symbol::new(table.id(), self.id))
    }

    /// Returns the bytes of the string, unless null.
    pub fn resolve(&self) -> Option<&'t [u8]> {
        self.table?.resolve(self.id)
    }

    /// Returns the bytes of the string, NUL terminator included, unless null.
    pub fn resolve_with_nul(&self) -> Option<&'t [u8]> {
        self.table?.resolve_with_nul(self.id)
    }

    /// Returns the string, unless null or not UTF-8.
    pub fn resolve_str(&self) -> Option<&'t str> {
        core::str::from_utf8(self.resolve()?).ok()
    }

    /// Returns the string as a C string, unless null or containing an interior NUL byte.
    pub fn as_c_str(&self) -> Option<&'t CStr> {
        CStr::from_bytes_with_nul(self.resolve_with_nul()?).ok()
    }
}

//  Crate methods
impl<'t, H> Handle<'t, H> {
    /// Creates a new instance.
    pub(crate) fn new(table: &'t Table<H>, id: StringId) -> Self {
        Self { table: Some(table), id }
    }
}

impl<H> Clone for Handle<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for Handle<'_, H> {}

impl<H> Default for Handle<'_, H> {
    fn default() -> Self {
        Self {
            table: None,
            id: StringId::EMPTY,
        }
    }
}

impl<H> PartialEq for Handle<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        let same_table = match (self.table, other.table) {
            (Some(this), Some(other)) => ptr::eq(this, other),
            (None, None) => true,
            _ => false,
        };

        same_table && self.id == other.id
    }
}

impl<H> Eq for Handle<'_, H> {}

impl<H> Hash for Handle<'_, H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.table.map(|table| table as *const Table<H>).hash(state);
        self.id.hash(state);
    }
}

impl<H> fmt::Debug for Handle<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("Handle")
            .field("table", &self.table_id().map(|id| id.get()))
            .field("id", &self.id.get())
            .finish()
    }
}

/// A `Symbol` is the detached form of a `Handle`: it does not borrow the `Table`, and may be stored anywhere.
///
/// #   Tied to the `Table` instance.
///
/// A `Symbol` is only meaningful for the `Table` instance which created it, use `Table::attach` to get a `Handle`
/// back.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Symbol {
    table: TableId,
    id: StringId,
}

impl Symbol {
    /// Creates a new instance.
    ///
    /// The result is only meaningful if `id` was assigned by the `Table` identified by `table`.
    pub fn new(table: TableId, id: StringId) -> Self {
        Self { table, id }
    }

    /// Returns the `TableId` of the `Table` which created this instance.
    pub fn table_id(&self) -> TableId {
        self.table
    }

    /// Returns the identifier of the string.
    pub fn id(&self) -> StringId {
        self.id
    }
}

// mod tests
