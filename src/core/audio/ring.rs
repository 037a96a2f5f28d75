//! Fixed ring of sample blocks between the render thread and the device callback
//!
//! The arena is `block_count` blocks of `block_samples` interleaved samples.
//! The producer fills whole blocks in order and waits when none is free; the
//! consumer drains them in the same order and never waits. When the consumer
//! catches up with the producer it outputs silence and counts an underrun.
//!
//! Each block has its own lock, but the free/filled counts guarantee the two
//! sides never touch the same block at the same time, so those locks are
//! uncontended.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct Shared {
    blocks: Box<[Mutex<Box<[f32]>>]>,
    block_samples: usize,
    free: AtomicUsize,
    filled: AtomicUsize,
    signal: Mutex<()>,
    space: Condvar,
    underruns: AtomicU64,
    blocks_played: AtomicU64,
}

/// Counters describing ring health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingStats {
    pub underruns: u64,
    pub blocks_played: u64,
}

impl Shared {
    fn stats(&self) -> RingStats {
        RingStats {
            underruns: self.underruns.load(Ordering::Relaxed),
            blocks_played: self.blocks_played.load(Ordering::Relaxed),
        }
    }
}

/// Create a ring with `block_count` blocks of `block_samples` samples each.
/// Both sizes are raised to at least one.
pub fn block_ring(block_count: usize, block_samples: usize) -> (RingProducer, RingConsumer) {
    let block_count = block_count.max(1);
    let block_samples = block_samples.max(1);
    let blocks = (0..block_count)
        .map(|_| Mutex::new(vec![0.0f32; block_samples].into_boxed_slice()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        blocks,
        block_samples,
        free: AtomicUsize::new(block_count),
        filled: AtomicUsize::new(0),
        signal: Mutex::new(()),
        space: Condvar::new(),
        underruns: AtomicU64::new(0),
        blocks_played: AtomicU64::new(0),
    });

    (
        RingProducer {
            shared: Arc::clone(&shared),
            cursor: 0,
        },
        RingConsumer {
            shared,
            cursor: 0,
            offset: 0,
        },
    )
}

/// Writing side, owned by the render thread
#[derive(Debug)]
pub struct RingProducer {
    shared: Arc<Shared>,
    cursor: usize,
}

impl RingProducer {
    pub fn block_samples(&self) -> usize {
        self.shared.block_samples
    }

    pub fn free_blocks(&self) -> usize {
        self.shared.free.load(Ordering::Acquire)
    }

    /// Block until a block is free or `timeout` passes. Returns whether a
    /// block is free. A notification that races the check costs at most one
    /// timeout.
    pub fn wait_for_space(&self, timeout: Duration) -> bool {
        if self.free_blocks() > 0 {
            return true;
        }
        let mut guard = self.shared.signal.lock();
        if self.free_blocks() > 0 {
            return true;
        }
        self.shared.space.wait_for(&mut guard, timeout);
        self.free_blocks() > 0
    }

    /// Fill the next free block. Returns false, without calling `fill`, when
    /// every block is still waiting to be played.
    pub fn push_block<F>(&mut self, fill: F) -> bool
    where
        F: FnOnce(&mut [f32]),
    {
        if self.free_blocks() == 0 {
            return false;
        }
        {
            let mut block = self.shared.blocks[self.cursor].lock();
            fill(&mut block[..]);
        }
        self.cursor = (self.cursor + 1) % self.shared.blocks.len();
        self.shared.free.fetch_sub(1, Ordering::AcqRel);
        self.shared.filled.fetch_add(1, Ordering::AcqRel);
        true
    }

    pub fn stats(&self) -> RingStats {
        self.shared.stats()
    }
}

/// Reading side, owned by the device callback
#[derive(Debug)]
pub struct RingConsumer {
    shared: Arc<Shared>,
    cursor: usize,
    offset: usize,
}

impl RingConsumer {
    /// Copy queued samples into `out`, padding with silence when the ring
    /// runs dry. Never blocks. Returns how many real samples were copied.
    pub fn pop_into(&mut self, out: &mut [f32]) -> usize {
        let shared = &self.shared;
        let mut written = 0;

        while written < out.len() {
            if shared.filled.load(Ordering::Acquire) == 0 {
                break;
            }
            let Some(block) = shared.blocks[self.cursor].try_lock() else {
                break;
            };
            let count = (out.len() - written).min(shared.block_samples - self.offset);
            out[written..written + count].copy_from_slice(&block[self.offset..self.offset + count]);
            drop(block);

            written += count;
            self.offset += count;

            if self.offset == shared.block_samples {
                self.offset = 0;
                self.cursor = (self.cursor + 1) % shared.blocks.len();
                shared.filled.fetch_sub(1, Ordering::AcqRel);
                shared.free.fetch_add(1, Ordering::AcqRel);
                shared.blocks_played.fetch_add(1, Ordering::Relaxed);
                shared.space.notify_one();
            }
        }

        if written < out.len() {
            out[written..].fill(0.0);
            shared.underruns.fetch_add(1, Ordering::Relaxed);
        }
        written
    }

    pub fn stats(&self) -> RingStats {
        self.shared.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn fill_with(value: f32) -> impl FnOnce(&mut [f32]) {
        move |block: &mut [f32]| block.fill(value)
    }

    #[test]
    fn producer_stops_when_full() {
        let (mut producer, _consumer) = block_ring(2, 4);
        assert!(producer.push_block(fill_with(1.0)));
        assert!(producer.push_block(fill_with(2.0)));
        assert!(!producer.push_block(|_| panic!("no block should be free")));
        assert_eq!(producer.free_blocks(), 0);
        assert!(!producer.wait_for_space(Duration::from_millis(1)));
    }

    #[test]
    fn consumer_reads_in_order_across_blocks() {
        let (mut producer, mut consumer) = block_ring(3, 4);
        producer.push_block(fill_with(1.0));
        producer.push_block(fill_with(2.0));

        let mut out = [0.0f32; 6];
        assert_eq!(consumer.pop_into(&mut out), 6);
        assert_eq!(out, [1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(producer.free_blocks(), 2);

        let mut rest = [9.0f32; 4];
        assert_eq!(consumer.pop_into(&mut rest), 2);
        assert_eq!(rest, [2.0, 2.0, 0.0, 0.0]);
        assert_eq!(consumer.stats().underruns, 1);
        assert_eq!(consumer.stats().blocks_played, 2);
    }

    #[test]
    fn empty_ring_plays_silence() {
        let (_producer, mut consumer) = block_ring(2, 8);
        let mut out = [0.5f32; 16];
        assert_eq!(consumer.pop_into(&mut out), 0);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(consumer.stats().underruns, 1);
    }

    #[test]
    fn cursor_wraps_around_the_arena() {
        let (mut producer, mut consumer) = block_ring(2, 2);
        let mut out = [0.0f32; 2];
        for round in 0..10 {
            assert!(producer.push_block(fill_with(round as f32)));
            assert_eq!(consumer.pop_into(&mut out), 2);
            assert_eq!(out, [round as f32; 2]);
        }
    }

    #[test]
    fn consumer_wakes_waiting_producer() {
        let (mut producer, mut consumer) = block_ring(1, 64);
        producer.push_block(fill_with(1.0));

        let reader = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut out = [0.0f32; 64];
            consumer.pop_into(&mut out)
        });

        assert!(producer.wait_for_space(Duration::from_secs(5)));
        assert_eq!(reader.join().unwrap(), 64);
    }

    #[test]
    fn threaded_stream_preserves_sample_order() {
        let (mut producer, mut consumer) = block_ring(4, 32);
        let blocks = 200;

        let writer = thread::spawn(move || {
            let mut next = 0u32;
            let mut pushed = 0;
            while pushed < blocks {
                if !producer.wait_for_space(Duration::from_millis(10)) {
                    continue;
                }
                producer.push_block(|block| {
                    for sample in block.iter_mut() {
                        *sample = next as f32;
                        next += 1;
                    }
                });
                pushed += 1;
            }
        });

        let mut expected = 0u32;
        let mut out = [0.0f32; 48];
        while expected < blocks * 32 {
            let copied = consumer.pop_into(&mut out);
            for sample in &out[..copied] {
                assert_eq!(*sample, expected as f32);
                expected += 1;
            }
            if copied == 0 {
                thread::yield_now();
            }
        }
        writer.join().unwrap();
    }
}
