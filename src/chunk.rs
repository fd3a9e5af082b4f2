//  A single chunk of the table: a fixed-capacity, append-only, byte buffer.

use core::{mem, ptr::NonNull};

use std::alloc::{self, Layout};

/// The default size of a chunk, in bytes.
pub const DEFAULT_CHUNK_SIZE: u32 = 4096;

/// The width of an identifier, in bytes.
///
/// Entries are padded to a multiple of this width, and the same amount is reserved at the tail of each chunk.
pub const ID_WIDTH: u32 = mem::size_of::<u32>() as u32;

/// The largest size of a chunk, in bytes.
///
/// Any multiple of `ID_WIDTH` up to this size is a valid allocation size, on all targets.
pub const MAX_CHUNK_SIZE: u32 = 1 << 30;

/// Returns the storage required for a string of `length` bytes: its bytes, a NUL terminator, padded to `ID_WIDTH`.
///
/// Returns `None` if the storage cannot be represented by an identifier.
pub(crate) fn aligned_length(length: usize) -> Option<u32> {
    let with_terminator = length.checked_add(1)?;
    let mask = ID_WIDTH as usize - 1;
    let aligned = with_terminator.checked_add(mask)? & !mask;

    u32::try_from(aligned).ok()
}

/// A fixed-capacity byte buffer, bump-allocated.
///
/// #   Invariants
///
/// -   `pos <= capacity - ID_WIDTH`.
/// -   Bytes in `[0, pos)` are committed, and never written again until the chunk is dropped.
/// -   The memory pointed to by `data` never moves, even when the chunk itself does.
pub(crate) struct Chunk {
    data: NonNull<u8>,
    capacity: u32,
    pos: u32,
}

impl Chunk {
    /// Creates a new, zeroed, chunk.
    ///
    /// #   Panics
    ///
    /// If `capacity` is not a multiple of `ID_WIDTH`, is less than twice `ID_WIDTH`, or exceeds `MAX_CHUNK_SIZE`.
    pub(crate) fn new(capacity: u32) -> Self {
        assert!(capacity >= 2 * ID_WIDTH);
        assert!(capacity <= MAX_CHUNK_SIZE);
        assert_eq!(0, capacity % ID_WIDTH);

        let layout = Self::layout(capacity);

        //  Safety:
        //  -   `layout` has a non-zero size.
        let data = unsafe { alloc::alloc_zeroed(layout) };

        let Some(data) = NonNull::new(data) else { alloc::handle_alloc_error(layout) };

        Self { data, capacity, pos: 0 }
    }

    /// Returns the total capacity, in bytes.
    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the number of committed bytes.
    pub(crate) fn len(&self) -> u32 {
        self.pos
    }

    /// Returns whether `size` more bytes can be written.
    pub(crate) fn has_space(&self, size: u32) -> bool {
        self.capacity - ID_WIDTH - self.pos >= size
    }

    /// Writes `bytes` at the cursor, NUL terminated and zero-padded up to `aligned` bytes, then advances the cursor.
    ///
    /// Returns a pointer to the first byte written.
    ///
    /// #   Safety
    ///
    /// -   `self.has_space(aligned)` must hold.
    /// -   `bytes.len() < aligned as usize` must hold.
    pub(crate) unsafe fn write(&mut self, bytes: &[u8], aligned: u32) -> NonNull<u8> {
        debug_assert!(self.has_space(aligned));
        debug_assert!(bytes.len() < aligned as usize);

        //  Safety:
        //  -   `self.pos` is within the allocation, as per invariant.
        let start = unsafe { self.data.as_ptr().add(self.pos as usize) };

        //  Safety:
        //  -   `start` is valid for writes of `aligned` bytes, as `self.has_space(aligned)`.
        //  -   `[start, start + aligned)` is uncommitted, hence not aliased by any outstanding slice.
        //  -   `bytes` cannot overlap, being borrowed while `self` is borrowed mutably.
        unsafe {
            start.copy_from_nonoverlapping(bytes.as_ptr(), bytes.len());
            start.add(bytes.len()).write_bytes(0, aligned as usize - bytes.len());
        }

        self.pos += aligned;

        //  Safety:
        //  -   `start` is derived from a non-null pointer, with an in-bounds offset.
        unsafe { NonNull::new_unchecked(start) }
    }

    //  Returns the layout of a chunk of `capacity` bytes.
    //
    //  `capacity` must not exceed `MAX_CHUNK_SIZE`.
    fn layout(capacity: u32) -> Layout {
        debug_assert!(capacity <= MAX_CHUNK_SIZE);

        //  Safety:
        //  -   The alignment of `u32` is a non-zero power of 2.
        //  -   `capacity <= MAX_CHUNK_SIZE`, which rounded up to the alignment stays below `isize::MAX` on all
        //      targets with at least 32-bits pointers.
        unsafe { Layout::from_size_align_unchecked(capacity as usize, mem::align_of::<u32>()) }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        //  Safety:
        //  -   `self.data` was allocated by the global allocator, with this very layout.
        //  -   `self.data` will no longer be used.
        unsafe { alloc::dealloc(self.data.as_ptr(), Self::layout(self.capacity)) }
    }
}

//  Safety:
//  -   A chunk exclusively owns its memory, writes require `&mut self`.
unsafe impl Send for Chunk {}
unsafe impl Sync for Chunk {}

/// The location of an entry: a pointer to its first byte, and its length, terminator excluded.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Entry {
    data: NonNull<u8>,
    length: u32,
}

impl Entry {
    /// Creates a new entry.
    ///
    /// #   Safety
    ///
    /// `data` must have been returned by `Chunk::write`, for a slice of `length` bytes.
    pub(crate) unsafe fn new(data: NonNull<u8>, length: u32) -> Self {
        Self { data, length }
    }

    /// Returns the length of the string, terminator excluded.
    pub(crate) fn len(&self) -> usize {
        self.length as usize
    }

    /// Returns the bytes of the string, terminator excluded.
    ///
    /// #   Safety
    ///
    /// The chunk this entry was written into must outlive `'a`.
    pub(crate) unsafe fn as_bytes<'a>(self) -> &'a [u8] {
        //  Safety:
        //  -   `self.data` points to `self.length` committed bytes, never written again.
        //  -   The chunk outlives `'a`.
        unsafe { core::slice::from_raw_parts(self.data.as_ptr(), self.len()) }
    }

    /// Returns the bytes of the string, terminator included.
    ///
    /// #   Safety
    ///
    /// The chunk this entry was written into must outlive `'a`.
    pub(crate) unsafe fn as_bytes_with_nul<'a>(self) -> &'a [u8] {
        //  Safety:
        //  -   `Chunk::write` always commits a terminator after the bytes.
        //  -   The chunk outlives `'a`.
        unsafe { core::slice::from_raw_parts(self.data.as_ptr(), self.len() + 1) }
    }
}

//  Safety:
//  -   An entry is a read-only view of committed, immutable, bytes.
unsafe impl Send for Entry {}
unsafe impl Sync for Entry {}

// mod tests
