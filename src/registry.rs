//  The registry: chunks, identifier to entry sequence, and content to identifier map.
//
//  The three are only ever accessed together, under the table's reader-writer lock.

use core::hash::{BuildHasher, Hasher};

use hashbrown::HashTable;
use tracing::debug;

use crate::{
    chunk::{self, Chunk, Entry, ID_WIDTH},
    error::TableError,
    id::StringId,
};

/// Hashes a slice of bytes.
///
/// All hashing of contents, whether for look-ups or re-hashing on growth, must go through this function.
#[inline]
pub(crate) fn hash_bytes<H>(hasher: &H, bytes: &[u8]) -> u64
where
    H: BuildHasher,
{
    let mut hasher = hasher.build_hasher();

    hasher.write(bytes);

    hasher.finish()
}

/// The bidirectional mapping between contents and identifiers, and the chunks backing the contents.
pub(crate) struct Registry {
    chunk_size: u32,
    max_strings: u32,
    //  Chunks are boxed-in by `Chunk` itself, hence growing `chunks` never moves the bytes.
    chunks: Vec<Chunk>,
    //  Indexed by `StringId`.
    entries: Vec<Entry>,
    //  Keyed by the content of `entries[id]`, not by its address.
    map: HashTable<StringId>,
}

impl Registry {
    /// Creates an empty registry, without any chunk.
    pub(crate) fn new(chunk_size: u32, max_strings: u32, capacity: usize) -> Self {
        Self {
            chunk_size,
            max_strings,
            chunks: Vec::new(),
            entries: Vec::with_capacity(capacity),
            map: HashTable::with_capacity(capacity),
        }
    }

    /// Returns the number of unique strings.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the chunks.
    pub(crate) fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns the usable capacity of a chunk, and thus the largest storage an entry may require.
    pub(crate) fn usable_chunk_size(&self) -> u32 {
        self.chunk_size - ID_WIDTH
    }

    /// Returns the identifier of `bytes`, if present.
    ///
    /// `hash` must have been computed by `hash_bytes`, with the hasher used for all insertions.
    pub(crate) fn find(&self, hash: u64, bytes: &[u8]) -> Option<StringId> {
        let entries = &self.entries;

        self.map
            .find(hash, |id| {
                //  Safety:
                //  -   `entries` borrows `self`, which owns the chunk.
                let candidate = unsafe { entries[id.index()].as_bytes() };

                candidate == bytes
            })
            .copied()
    }

    /// Returns the entry of `id`, if in bounds.
    pub(crate) fn get(&self, id: StringId) -> Option<Entry> {
        self.entries.get(id.index()).copied()
    }

    /// Returns an iterator over all identifiers and their entries, in creation order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (StringId, Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (StringId::new(index as u32), *entry))
    }

    /// Inserts `bytes`, unconditionally, assigning the next identifier.
    ///
    /// The caller is expected to have checked, under the same exclusive borrow, that `bytes` is absent.
    ///
    /// Nothing is written, nor assigned, if an error is returned.
    pub(crate) fn insert<H>(&mut self, hash: u64, bytes: &[u8], hasher: &H) -> Result<StringId, TableError>
    where
        H: BuildHasher,
    {
        debug_assert!(self.find(hash, bytes).is_none());

        let capacity = self.usable_chunk_size();

        let aligned = match chunk::aligned_length(bytes.len()) {
            Some(aligned) if aligned <= capacity => aligned,
            aligned => {
                return Err(TableError::StringTooLarge {
                    length: bytes.len(),
                    required: aligned.unwrap_or(u32::MAX),
                    capacity,
                })
            }
        };

        if self.entries.len() >= self.max_strings as usize {
            return Err(TableError::IdSpaceExhausted(self.max_strings));
        }

        let id = StringId::new(self.entries.len() as u32);
        let chunk = self.alloc_chunk(aligned);

        //  Safety:
        //  -   `alloc_chunk` only returns a chunk with space for `aligned` bytes.
        //  -   `aligned` accounts for the terminator, hence `bytes.len() < aligned`.
        let data = unsafe { chunk.write(bytes, aligned) };

        //  Safety:
        //  -   `data` was just written, with `bytes.len()` bytes, which fits in `u32` as `aligned` does.
        let entry = unsafe { Entry::new(data, bytes.len() as u32) };

        self.entries.push(entry);

        let entries = &self.entries;

        self.map.insert_unique(hash, id, |id| {
            //  Safety:
            //  -   `entries` borrows `self`, which owns the chunk.
            let bytes = unsafe { entries[id.index()].as_bytes() };

            hash_bytes(hasher, bytes)
        });

        Ok(id)
    }

    //  Returns the most recent chunk if it has room for `size` bytes, or appends a brand new chunk otherwise.
    //
    //  `size` must not exceed `self.usable_chunk_size()`.
    fn alloc_chunk(&mut self, size: u32) -> &mut Chunk {
        debug_assert!(size <= self.usable_chunk_size());

        let reuse = self.chunks.last().is_some_and(|chunk| chunk.has_space(size));

        if !reuse {
            debug!(chunk = self.chunks.len(), capacity = self.chunk_size, "allocating chunk");

            self.chunks.push(Chunk::new(self.chunk_size));
        }

        let last = self.chunks.len() - 1;

        &mut self.chunks[last]
    }
}

// mod tests
