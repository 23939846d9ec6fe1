//! Fixed-capacity, lock-free membership set.
//!
//! Keys are reduced to a 32-bit hash and stored in an `N x N` grid of atomic
//! slots. Slot value `0` means empty; there are no tombstones and no removal.
//! Collisions are resolved by double hashing over the grid, and a key is
//! inserted with a single compare-and-swap, so concurrent workers can share
//! one set without locks.
//!
//! A key whose hash is `0` (the empty string, for instance) can never be
//! found: `0` is indistinguishable from an empty slot. Such keys are not
//! stored and take up no capacity.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use pouch_core::error::{PouchError, PouchResult};

/// Membership set shared by all workers of a run
#[derive(Debug)]
pub struct MembershipSet {
    /// Grid side length and key capacity
    size: usize,
    /// `size * size` slots, row-major
    slots: Box<[AtomicU32]>,
    /// Keys stored or reserved so far
    len: AtomicUsize,
}

impl MembershipSet {
    /// Create a set that holds up to `size` keys
    pub fn new(size: usize) -> PouchResult<Self> {
        if size < 2 {
            return Err(PouchError::ConfigValidation {
                field: "membership_capacity".to_string(),
                reason: format!("must be at least 2, got {}", size),
            });
        }

        let slots = (0..size * size).map(|_| AtomicU32::new(0)).collect();
        Ok(Self {
            size,
            slots,
            len: AtomicUsize::new(0),
        })
    }

    /// `h = h * 31 + unit` over the UTF-16 code units of `key`, wrapping at 2^32
    pub fn hash(key: &str) -> u32 {
        key.encode_utf16()
            .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire).min(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `key`; adding a key that is already present is a no-op
    pub fn add(&self, key: &str) -> PouchResult<()> {
        self.claim(key).map(|_| ())
    }

    /// Insert `key` and report whether this call inserted it
    ///
    /// Exactly one of several concurrent claims for the same key returns
    /// `true`.
    pub fn claim(&self, key: &str) -> PouchResult<bool> {
        let hash = Self::hash(key);
        if hash == 0 {
            return Ok(false);
        }
        let (mut row, mut col) = self.origin(hash);
        let mut reserved = false;

        for attempt in 1..=self.size {
            let slot = &self.slots[row * self.size + col];
            let mut current = slot.load(Ordering::Acquire);

            if current == 0 {
                if !reserved {
                    self.reserve()?;
                    reserved = true;
                }
                match slot.compare_exchange(0, hash, Ordering::AcqRel, Ordering::Acquire) {
                    Ok(_) => return Ok(true),
                    Err(actual) => current = actual,
                }
            }

            if current == hash {
                self.unreserve(reserved);
                return Ok(false);
            }

            (row, col) = self.probe(row, col, attempt);
        }

        self.unreserve(reserved);
        Err(PouchError::CapacityExceeded {
            capacity: self.size,
        })
    }

    /// Whether `key` was added; stops at the first empty slot on its probe path
    pub fn has(&self, key: &str) -> bool {
        let hash = Self::hash(key);
        let (mut row, mut col) = self.origin(hash);

        for attempt in 1..=self.size {
            match self.slots[row * self.size + col].load(Ordering::Acquire) {
                0 => return false,
                current if current == hash => return true,
                _ => {},
            }
            (row, col) = self.probe(row, col, attempt);
        }

        false
    }

    fn origin(&self, hash: u32) -> (usize, usize) {
        let hash = hash as usize;
        (hash % self.size, (hash / self.size) % self.size)
    }

    /// Next probe position; the row advances whenever the column wraps to 0
    fn probe(&self, row: usize, col: usize, attempt: usize) -> (usize, usize) {
        let n = self.size as u64;
        let (row64, col64, attempt64) = (row as u64, col as u64, attempt as u64);
        let linear = row64 * n + col64;
        let step = (n - 1) - (linear % (n - 1));
        let next_col = (col64 + attempt64 * step) % n;
        let next_row = if next_col == 0 {
            (row64 + attempt64) % n
        } else {
            row64
        };
        (next_row as usize, next_col as usize)
    }

    fn reserve(&self) -> PouchResult<()> {
        self.len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                (len < self.size).then_some(len + 1)
            })
            .map(|_| ())
            .map_err(|_| PouchError::CapacityExceeded {
                capacity: self.size,
            })
    }

    fn unreserve(&self, reserved: bool) {
        if reserved {
            self.len.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests;
