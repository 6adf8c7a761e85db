//! Lock-Free Ingest Rings Between Sensor Adapters and the Correlation Worker
#![allow(unsafe_code)] // Required for lock-free atomic operations
//!
//! ## Overview
//!
//! Each sensor adapter is an independent producer; the correlation worker is
//! the single logical consumer. Adapters must never block - a radar interrupt
//! handler cannot wait on the worker - so the boundary between them is this
//! bounded, lock-free ring.
//!
//! ```text
//! Radar adapter  ──→ IngestQueue ──┐
//!                                  ├──→ correlation worker
//! Vision adapter ──→ IngestQueue ──┘
//! ```
//!
//! ## Overflow Policy
//!
//! When a ring is full the *oldest unprocessed* raw event is displaced to
//! make room for the new one ([`IngestQueue::push_displace`]). Backpressure
//! is pushed to the least-costly point: raw, not-yet-fused events, rather
//! than fused output. Every displacement is counted in [`QueueStats`].
//!
//! Displacement works because the pop path uses a CAS loop - the producer
//! may safely act as an extra consumer for the one slot it reclaims, the
//! same way any second consumer would.
//!
//! ## Algorithm
//!
//! Ring buffer with atomic head/tail, capacity a power of two so the index
//! wrap is a mask:
//!
//! - **Push** (producer): load head Acquire, check full against tail, write
//!   the slot, publish with a Release store of head.
//! - **Pop** (consumer): CAS the tail forward, then read the claimed slot.
//!
//! Statistics use Relaxed ordering; they never affect correctness.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::ptr;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Ring statistics - queue health without data-path cost
#[derive(Debug)]
pub struct QueueStats {
    /// Total events pushed
    pub pushed: AtomicU32,
    /// Total events popped by the worker
    pub popped: AtomicU32,
    /// Raw events shed by the overflow policy (oldest displaced, or newest
    /// rejected under `RejectNewest`)
    pub displaced: AtomicU32,
    /// Maximum depth seen
    pub max_depth: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            displaced: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    /// Update max depth if current is higher
    fn update_max_depth(&self, current: u32) {
        let mut max = self.max_depth.load(Ordering::Relaxed);
        while current > max {
            match self.max_depth.compare_exchange_weak(
                max,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }
}

/// Bounded lock-free ring carrying raw events from one adapter
///
/// `N` must be a power of two. One producer (the adapter); pops are CAS-based
/// so the displacement path and the worker can both safely claim slots.
pub struct IngestQueue<T, const N: usize> {
    /// Ring buffer storage, interior-mutable behind the atomic indices
    buffer: UnsafeCell<[MaybeUninit<T>; N]>,

    /// Next write position (producer owned)
    head: AtomicUsize,

    /// Next read position (claimed by CAS)
    tail: AtomicUsize,

    /// Ring statistics
    stats: QueueStats,
}

impl<T, const N: usize> IngestQueue<T, N> {
    const CAPACITY_CHECK: () = assert!(
        N.is_power_of_two() && N >= 2,
        "IngestQueue capacity must be a power of two >= 2"
    );

    /// Create new empty ring
    ///
    /// Can be used in static context, so hosts can hand adapter threads a
    /// `&'static` ring without any startup handshake.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_CHECK;

        Self {
            buffer: UnsafeCell::new(unsafe {
                // Array of MaybeUninit needs no initialization
                MaybeUninit::<[MaybeUninit<T>; N]>::uninit().assume_init()
            }),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            stats: QueueStats::new(),
        }
    }

    /// Push an event (single producer)
    ///
    /// Returns false if the ring is full; nothing is dropped.
    ///
    /// ## Safety contract
    /// Only one thread may push.
    pub fn push(&self, event: T) -> bool {
        self.try_push(event).is_ok()
    }

    /// Push, displacing the oldest unprocessed event if the ring is full
    ///
    /// Returns true if an old event was displaced to make room.
    pub fn push_displace(&self, event: T) -> bool {
        let mut displaced = false;
        let mut event = event;

        loop {
            match self.try_push(event) {
                Ok(()) => return displaced,
                Err(back) => {
                    event = back;
                    if self.pop().is_some() {
                        self.stats.displaced.fetch_add(1, Ordering::Relaxed);
                        // popped counter tracks worker consumption only
                        self.stats.popped.fetch_sub(1, Ordering::Relaxed);
                        displaced = true;
                    }
                }
            }
        }
    }

    /// Push under a runtime soft bound below the ring's hard capacity
    ///
    /// Displaces oldest entries until the depth is under `soft_capacity`,
    /// then pushes (displacing once more if the ring itself is full).
    /// Returns true if anything was displaced. A `soft_capacity` at or above
    /// the hard capacity makes this identical to
    /// [`IngestQueue::push_displace`].
    pub fn push_bounded(&self, event: T, soft_capacity: usize) -> bool {
        let mut displaced = false;

        while self.len() >= soft_capacity {
            if self.pop().is_some() {
                self.stats.displaced.fetch_add(1, Ordering::Relaxed);
                self.stats.popped.fetch_sub(1, Ordering::Relaxed);
                displaced = true;
            } else {
                break;
            }
        }

        self.push_displace(event) || displaced
    }

    fn try_push(&self, event: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Acquire);
        let next_head = (head + 1) & (N - 1);

        if next_head == self.tail.load(Ordering::Acquire) {
            return Err(event);
        }

        // Sole producer owns the head slot
        unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[head].write(event);
        }

        // Make the write visible before publishing head
        self.head.store(next_head, Ordering::Release);

        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth(self.len() as u32);
        Ok(())
    }

    /// Pop the next event
    ///
    /// Returns None if the ring is empty.
    pub fn pop(&self) -> Option<T> {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);

            if tail == head {
                return None;
            }

            let next_tail = (tail + 1) & (N - 1);
            match self.tail.compare_exchange_weak(
                tail,
                next_tail,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let event = unsafe {
                        let buffer = &*self.buffer.get();
                        ptr::read(&buffer[tail]).assume_init()
                    };

                    self.stats.popped.fetch_add(1, Ordering::Relaxed);
                    return Some(event);
                }
                Err(_) => {
                    // Displacement path claimed the slot first; retry
                    core::hint::spin_loop();
                }
            }
        }
    }

    /// Current depth
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);

        if head >= tail {
            head - tail
        } else {
            N - tail + head
        }
    }

    /// Check if the ring is empty
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Check if the ring is full
    pub fn is_full(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        ((head + 1) & (N - 1)) == tail
    }

    /// Ring statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Usable capacity (one slot is reserved to distinguish full from empty)
    pub const fn capacity() -> usize {
        N - 1
    }
}

impl<T, const N: usize> Drop for IngestQueue<T, N> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T, const N: usize> Default for IngestQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

// The ring handles its own synchronization
unsafe impl<T: Send, const N: usize> Send for IngestQueue<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for IngestQueue<T, N> {}
