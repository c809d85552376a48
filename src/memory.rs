//! Memory pool backing pscript runtime values.
//!
//! A bounded byte arena managed by a power-of-two buddy allocator:
//! - `allocate` rounds the request up to the next power of two (floored at
//!   [`MIN_BLOCK_SIZE`]) and splits free blocks into buddy halves until a
//!   block of exactly that size is found.
//! - `free` zeroes the block and merges buddy pairs back together on the
//!   way up.
//! - A small cache of minimum-size blocks short-circuits the hot
//!   allocate/free path for scalar values.
//!
//! Clients hold opaque byte offsets ([`Pointer`]); the sentinel
//! [`NULL_POINTER`] denotes "no allocation". The pool is a single-context
//! resource and is not safe for concurrent use.

use crate::errors::{invalid_pointer, Error};

/// Opaque byte offset into the pool.
pub type Pointer = usize;

/// Sentinel offset denoting a null pointer.
pub const NULL_POINTER: Pointer = usize::MAX;

/// Smallest block the allocator hands out.
pub const MIN_BLOCK_SIZE: usize = 8;

/// Capacity of the minimum-size block cache.
const SMALL_BLOCK_CACHE_SIZE: usize = 8;

/// A node in the buddy tree. A block without children is a leaf that can be
/// handed out whole; a subdivided block owns two buddies of half its size.
#[derive(Debug)]
struct Block {
    ptr: Pointer,
    size: usize,
    free: bool,
    left: Option<Box<Block>>,
    right: Option<Box<Block>>,
}

impl Block {
    fn new(ptr: Pointer, size: usize) -> Self {
        Block {
            ptr,
            size,
            free: true,
            left: None,
            right: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Split this block into two buddies of half the size. Fails on blocks
    /// that are already minimum-size, allocated, or subdivided.
    fn subdivide(&mut self) -> bool {
        if self.size <= MIN_BLOCK_SIZE {
            return false;
        }
        if !self.free {
            return false;
        }
        if !self.is_leaf() {
            return false;
        }

        let half = self.size / 2;
        // Subdivided blocks are never handed out whole.
        self.free = false;
        self.left = Some(Box::new(Block::new(self.ptr, half)));
        self.right = Some(Box::new(Block::new(self.ptr + half, self.size - half)));
        true
    }
}

/// Fixed-size byte arena with buddy subdivision and merging.
#[derive(Debug)]
pub struct MemoryPool {
    bytes: Vec<u8>,
    root: Box<Block>,
    /// Offsets of freed minimum-size blocks, consumed before tree descent.
    small_blocks: Vec<Pointer>,
}

impl MemoryPool {
    /// Create a pool spanning `size` bytes, zero-initialized.
    pub fn new(size: usize) -> Self {
        MemoryPool {
            bytes: vec![0; size],
            root: Box::new(Block::new(0, size)),
            small_blocks: Vec::with_capacity(SMALL_BLOCK_CACHE_SIZE),
        }
    }

    /// Total capacity in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether `ptr` is a dereferenceable offset.
    pub fn verify_pointer(&self, ptr: Pointer) -> bool {
        ptr != NULL_POINTER && ptr < self.bytes.len()
    }

    /// Allocate at least `bytes` bytes, returning the block offset or
    /// [`NULL_POINTER`] when no large-enough free block exists.
    pub fn allocate(&mut self, bytes: usize) -> Pointer {
        let block_size = bytes.max(MIN_BLOCK_SIZE).next_power_of_two();

        // Minimum-size requests are served from the cache first.
        if block_size == MIN_BLOCK_SIZE {
            if let Some(ptr) = self.small_blocks.pop() {
                reserve_block(&mut self.root, ptr);
                return ptr;
            }
        }

        match find_block(&mut self.root, block_size) {
            Some(block) => {
                block.free = false;
                block.ptr
            }
            None => NULL_POINTER,
        }
    }

    /// Free a previously allocated offset. Freeing the sentinel or an
    /// out-of-range offset does nothing; freeing an already-free block is
    /// detected by the tree walk and ignored.
    pub fn free(&mut self, ptr: Pointer) {
        if !self.verify_pointer(ptr) {
            return;
        }
        free_block(
            &mut self.root,
            ptr,
            &mut self.bytes,
            &mut self.small_blocks,
        );
    }

    /// Typed read at `ptr`.
    pub fn read<T: PoolData>(&self, ptr: Pointer) -> Result<T, Error> {
        self.check_range(ptr, T::SIZE)?;
        Ok(T::read_from(&self.bytes[ptr..ptr + T::SIZE]))
    }

    /// Typed write at `ptr`.
    pub fn write<T: PoolData>(&mut self, ptr: Pointer, value: T) -> Result<(), Error> {
        self.check_range(ptr, T::SIZE)?;
        value.write_to(&mut self.bytes[ptr..ptr + T::SIZE]);
        Ok(())
    }

    /// Raw byte read, used by tests to observe zeroing.
    pub fn byte_at(&self, ptr: Pointer) -> Result<u8, Error> {
        self.check_range(ptr, 1)?;
        Ok(self.bytes[ptr])
    }

    fn check_range(&self, ptr: Pointer, len: usize) -> Result<(), Error> {
        if ptr == NULL_POINTER || ptr + len > self.bytes.len() {
            return Err(invalid_pointer(ptr));
        }
        Ok(())
    }
}

/// Find a free block of exactly `size` bytes under `block`, subdividing
/// larger free blocks on the way down.
fn find_block(block: &mut Block, size: usize) -> Option<&mut Block> {
    if block.size < size {
        return None;
    }
    if block.is_leaf() {
        if !block.free {
            return None;
        }
        if block.size == size {
            return Some(block);
        }
        if !block.subdivide() {
            return None;
        }
    }

    let Block { left, right, .. } = block;
    if let Some(l) = left {
        if let Some(found) = find_block(l, size) {
            return Some(found);
        }
    }
    if let Some(r) = right {
        return find_block(r, size);
    }
    None
}

/// Mark the cached leaf holding `ptr` as allocated again. Descent pivots on
/// the right child's offset.
fn reserve_block(block: &mut Block, ptr: Pointer) {
    if block.is_leaf() {
        if block.ptr == ptr {
            block.free = false;
        }
        return;
    }
    let Block { left, right, .. } = block;
    if let (Some(l), Some(r)) = (left, right) {
        if ptr < r.ptr {
            reserve_block(l, ptr);
        } else {
            reserve_block(r, ptr);
        }
    }
}

/// Free the allocated leaf at `ptr`, zero its bytes, feed the small-block
/// cache, and merge buddy pairs along the descent path. Returns false when
/// no allocated block holds `ptr` (best-effort double-free detection).
fn free_block(
    block: &mut Block,
    ptr: Pointer,
    bytes: &mut [u8],
    cache: &mut Vec<Pointer>,
) -> bool {
    if block.is_leaf() {
        if block.ptr != ptr || block.free {
            return false;
        }
        block.free = true;
        bytes[block.ptr..block.ptr + block.size].fill(0);
        if block.size == MIN_BLOCK_SIZE && cache.len() < SMALL_BLOCK_CACHE_SIZE {
            cache.push(block.ptr);
        }
        return true;
    }

    let pivot = match &block.right {
        Some(right) => right.ptr,
        None => return false,
    };
    let freed = if ptr < pivot {
        match &mut block.left {
            Some(left) => free_block(left, ptr, bytes, cache),
            None => false,
        }
    } else {
        match &mut block.right {
            Some(right) => free_block(right, ptr, bytes, cache),
            None => false,
        }
    };
    if freed {
        merge_blocks(block, cache);
    }
    freed
}

/// Merge two free buddy leaves back into their parent. Blocks sitting in the
/// small-block cache are not candidates for coalescing.
fn merge_blocks(parent: &mut Block, cache: &[Pointer]) -> bool {
    let (left_ptr, right_ptr) = match (&parent.left, &parent.right) {
        (Some(l), Some(r)) if l.is_leaf() && r.is_leaf() && l.free && r.free => (l.ptr, r.ptr),
        _ => return false,
    };
    if cache.contains(&left_ptr) || cache.contains(&right_ptr) {
        return false;
    }
    parent.left = None;
    parent.right = None;
    parent.free = true;
    true
}

/// Fixed-width scalar data that can live in the pool.
pub trait PoolData: Sized {
    const SIZE: usize;
    fn read_from(bytes: &[u8]) -> Self;
    fn write_to(&self, bytes: &mut [u8]);
}

impl PoolData for i32 {
    const SIZE: usize = 4;

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        i32::from_le_bytes(buf)
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl PoolData for u32 {
    const SIZE: usize = 4;

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        u32::from_le_bytes(buf)
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl PoolData for f32 {
    const SIZE: usize = 4;

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&bytes[..4]);
        f32::from_le_bytes(buf)
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[..4].copy_from_slice(&self.to_le_bytes());
    }
}

impl PoolData for bool {
    const SIZE: usize = 1;

    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_to(&self, bytes: &mut [u8]) {
        bytes[0] = u8::from(*self);
    }
}
