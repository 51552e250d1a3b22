// File: src/cache/ring_buffer.rs

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::Error;

/// One storage cell. `seq` is the write sequence number of the value held,
/// so readers can tell a live entry from one that has been lapped.
struct Slot<T> {
    seq: u64,
    value: Option<T>,
}

/// Fixed-capacity, insertion-ordered ring of recent values.
///
/// Writers claim a sequence number from a monotonic counter and then fill the
/// slot `seq % capacity`; once the ring is full every insert overwrites the
/// oldest entry. Each slot has its own small lock, so inserts, snapshots and
/// in-place updates never contend on a single cache-wide lock.
///
/// Reads are point-in-time but not linearizable with concurrent inserts: a
/// snapshot may miss a value whose sequence was claimed but not yet written,
/// or include one that gets evicted right after it was read.
pub struct RingBuffer<T> {
    slots: Box<[Mutex<Slot<T>>]>,
    write: AtomicU64,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::Config("ring buffer capacity must be non-zero".into()));
        }

        let slots = (0..capacity)
            .map(|_| Mutex::new(Slot { seq: 0, value: None }))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            write: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries (never more than `capacity`).
    pub fn len(&self) -> usize {
        let written = self.write.load(Ordering::Acquire);
        written.min(self.slots.len() as u64) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value, evicting the oldest one when the ring is full.
    pub fn add(&self, value: T) {
        let seq = self.write.fetch_add(1, Ordering::AcqRel);
        let mut slot = self.slot(seq).lock();

        // A writer that stalled between claiming its sequence and taking the
        // lock must not overwrite a value from a later lap.
        if slot.value.is_none() || slot.seq < seq {
            slot.seq = seq;
            slot.value = Some(value);
        }
    }

    /// Call `f` on every live entry, oldest first, with mutable access.
    /// Entries are never moved or removed.
    pub fn for_each_mut<F>(&self, mut f: F)
    where
        F: FnMut(&mut T),
    {
        for seq in self.live_range() {
            let mut slot = self.slot(seq).lock();
            if slot.seq != seq {
                continue;
            }
            if let Some(value) = slot.value.as_mut() {
                f(value);
            }
        }
    }

    /// Read-only walk over live entries, oldest first.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T),
    {
        self.for_each_mut(|value| f(value));
    }

    fn live_range(&self) -> std::ops::Range<u64> {
        let end = self.write.load(Ordering::Acquire);
        let start = end.saturating_sub(self.slots.len() as u64);
        start..end
    }

    fn slot(&self, seq: u64) -> &Mutex<Slot<T>> {
        &self.slots[(seq % self.slots.len() as u64) as usize]
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy of every live entry, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(|value| out.push(value.clone()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(RingBuffer::<u32>::new(0).is_err());
    }

    #[test]
    fn fills_then_evicts_oldest() {
        let ring = RingBuffer::new(3).unwrap();
        assert!(ring.is_empty());

        ring.add(1);
        ring.add(2);
        assert_eq!(ring.snapshot(), vec![1, 2]);
        assert_eq!(ring.len(), 2);

        ring.add(3);
        ring.add(4);
        ring.add(5);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.capacity(), 3);
        assert_eq!(ring.snapshot(), vec![3, 4, 5]);
    }

    #[test]
    fn for_each_mut_updates_in_place() {
        let ring = RingBuffer::new(4).unwrap();
        for n in 0..6 {
            ring.add(n);
        }
        ring.for_each_mut(|n| {
            if *n % 2 == 0 {
                *n *= 10;
            }
        });
        assert_eq!(ring.snapshot(), vec![20, 3, 40, 5]);
    }
}
