//! Worker pool for the per-particle stages.
//!
//! Work is split into one contiguous chunk per worker (static partitioning).
//! Stages never share mutable state across particles, so the only
//! synchronization is the join at the end of each call.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::MandalaError;

/// A fixed-size pool of simulation workers.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers; `0` uses all available parallelism.
    pub fn new(threads: usize) -> Result<Self, MandalaError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mandala-worker-{i}"))
            .build()?;
        log::debug!("worker pool ready with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Effective number of workers.
    #[inline]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Length of each contiguous partition for `len` items.
    #[inline]
    pub fn chunk_len(&self, len: usize) -> usize {
        len.div_ceil(self.threads().max(1)).max(1)
    }

    /// Apply `f(index, item)` to every item, in parallel.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        let chunk = self.chunk_len(items.len());
        self.pool.install(|| {
            items
                .par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(c, part)| {
                    let base = c * chunk;
                    for (j, item) in part.iter_mut().enumerate() {
                        f(base + j, item);
                    }
                });
        });
    }

    /// Write `f(index, &inputs[index])` into `outputs[index]`, in parallel.
    ///
    /// `inputs` and `outputs` must have the same length.
    pub fn map_into<A, B, F>(&self, inputs: &[A], outputs: &mut [B], f: F)
    where
        A: Sync,
        B: Send,
        F: Fn(usize, &A) -> B + Sync,
    {
        debug_assert_eq!(inputs.len(), outputs.len());
        let chunk = self.chunk_len(outputs.len());
        self.pool.install(|| {
            outputs
                .par_chunks_mut(chunk)
                .zip(inputs.par_chunks(chunk))
                .enumerate()
                .for_each(|(c, (out, inp))| {
                    let base = c * chunk;
                    for (j, (o, i)) in out.iter_mut().zip(inp).enumerate() {
                        *o = f(base + j, i);
                    }
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_thread_count() {
        let pool = WorkerPool::new(3).unwrap();
        assert_eq!(pool.threads(), 3);
        assert_eq!(pool.chunk_len(10), 4);
        assert_eq!(pool.chunk_len(0), 1);
    }

    #[test]
    fn test_auto_thread_count() {
        let pool = WorkerPool::new(0).unwrap();
        assert!(pool.threads() >= 1);
    }

    #[test]
    fn test_for_each_mut_sees_global_indices() {
        let pool = WorkerPool::new(4).unwrap();
        let mut items = vec![0usize; 1003];
        pool.for_each_mut(&mut items, |i, item| *item = i * 2);
        for (i, v) in items.iter().enumerate() {
            assert_eq!(*v, i * 2);
        }
    }

    #[test]
    fn test_map_into() {
        let pool = WorkerPool::new(3).unwrap();
        let inputs: Vec<u32> = (0..257).collect();
        let mut outputs = vec![0u64; inputs.len()];
        pool.map_into(&inputs, &mut outputs, |i, v| (*v as u64) * 10 + i as u64);
        for (i, v) in outputs.iter().enumerate() {
            assert_eq!(*v, i as u64 * 11);
        }
    }
}
