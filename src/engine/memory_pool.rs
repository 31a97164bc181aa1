//! Preallocated sample memory for processors that need delay lines.
//!
//! All blocks are allocated when the engine is built. Checking a block out
//! moves its `Box` out of the free list and returning it moves it back, so the
//! audio thread never touches the allocator.

use tracing::trace;

pub struct PoolBlock {
    data: Box<[f32]>,
}

impl PoolBlock {
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub struct MemoryPool {
    free: Vec<PoolBlock>,
    block_len: usize,
    total: usize,
}

impl MemoryPool {
    pub fn new(block_len: usize, blocks: usize) -> Self {
        let block_len = block_len.max(1);
        let free = (0..blocks)
            .map(|_| PoolBlock {
                data: vec![0.0; block_len].into_boxed_slice(),
            })
            .collect::<Vec<_>>();
        Self {
            free,
            block_len,
            total: blocks,
        }
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Take a zeroed block, or `None` when the pool is exhausted.
    pub fn checkout_block(&mut self) -> Option<PoolBlock> {
        let mut block = self.free.pop();
        match block.as_mut() {
            Some(b) => b.data.fill(0.0),
            None => trace!(total = self.total, "memory pool exhausted"),
        }
        block
    }

    pub fn return_block(&mut self, block: PoolBlock) {
        // capacity was reserved up front, so this push never reallocates
        self.free.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_and_return() {
        let mut pool = MemoryPool::new(64, 2);
        let mut a = pool.checkout_block().expect("first block");
        let b = pool.checkout_block().expect("second block");
        assert!(pool.checkout_block().is_none());
        a.as_mut_slice()[0] = 3.0;
        pool.return_block(a);
        pool.return_block(b);
        assert_eq!(pool.available(), 2);
        let again = pool.checkout_block().expect("returned block");
        assert!(again.as_slice().iter().all(|&x| x == 0.0), "blocks come back zeroed");
        assert_eq!(again.len(), 64);
    }
}
