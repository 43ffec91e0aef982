use std::fmt;

/// Round `value` up to the nearest multiple of `alignment`.
///
/// `alignment` must be > 0.
fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment > 0);
    value.div_ceil(alignment) * alignment
}

/// Reference to a byte range inside a [`ScratchArena`].
///
/// A `BlobRef` is only meaningful together with the arena it was allocated
/// from; it never outlives the blob it points at because the arena frees
/// nothing until it is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobRef {
    block: u32,
    offset: u32,
    len: u32,
}

impl BlobRef {
    pub fn len(self) -> usize {
        self.len as usize
    }
}

struct Block {
    data: Vec<u8>,
}

/// Bump allocator over a growable list of byte blocks.
///
/// Allocations bump an offset inside the current block; when a request does
/// not fit, a new block sized `max(64 KiB, size + alignment)` is appended.
/// There is no per-allocation free: all memory is released when the arena
/// itself drops.
#[derive(Default)]
pub struct ScratchArena {
    blocks: Vec<Block>,
}

impl ScratchArena {
    const MIN_BLOCK_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    fn add_block(&mut self, minimum_size: usize) {
        let capacity = minimum_size.max(Self::MIN_BLOCK_SIZE);
        self.blocks.push(Block {
            data: Vec::with_capacity(capacity),
        });
    }

    /// Reserve `size` bytes at `alignment` and return `(block, offset)` for
    /// the caller to fill. Padding bytes introduced by alignment are zeroed.
    fn reserve(&mut self, size: usize, alignment: usize) -> (usize, usize) {
        let alignment = alignment.max(1);
        let fits = self.blocks.last().is_some_and(|block| {
            align_up(block.data.len(), alignment) + size <= block.data.capacity()
        });
        if !fits {
            self.add_block(size + alignment);
        }

        let index = self.blocks.len() - 1;
        let block = &mut self.blocks[index];
        let offset = align_up(block.data.len(), alignment);
        block.data.resize(offset, 0);
        (index, offset)
    }

    /// Allocate a zeroed region of `size` bytes.
    pub fn alloc_cleared(&mut self, size: usize, alignment: usize) -> BlobRef {
        let (block, offset) = self.reserve(size, alignment);
        self.blocks[block].data.resize(offset + size, 0);
        BlobRef {
            block: block as u32,
            offset: offset as u32,
            len: size as u32,
        }
    }

    /// Copy `bytes` into the arena.
    pub fn alloc_bytes(&mut self, bytes: &[u8], alignment: usize) -> BlobRef {
        let blob = self.alloc_cleared(bytes.len(), alignment);
        self.get_mut(blob).copy_from_slice(bytes);
        blob
    }

    pub fn get(&self, blob: BlobRef) -> &[u8] {
        let start = blob.offset as usize;
        &self.blocks[blob.block as usize].data[start..start + blob.len as usize]
    }

    fn get_mut(&mut self, blob: BlobRef) -> &mut [u8] {
        let start = blob.offset as usize;
        &mut self.blocks[blob.block as usize].data[start..start + blob.len as usize]
    }
}

impl fmt::Debug for ScratchArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchArena")
            .field("blocks", &self.blocks.len())
            .field(
                "bytes",
                &self.blocks.iter().map(|b| b.data.len()).sum::<usize>(),
            )
            .finish()
    }
}
