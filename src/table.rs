//! Linear-probing hash table with tombstones.
//!
//! Backs both the credential table (keyed by login) and the vault table
//! (keyed by login+service). Slot state is a sum type over a growable
//! vector, so a slot is exactly one of empty, live, or tombstoned.

use crate::error::{Error, Result};

const FNV_SEED: u64 = 2166136261;
const FNV_PRIME: u64 = 16777619;

/// Capacity ladder for rehashing; growth falls back to doubling once the
/// ladder is exhausted.
const PRIMES: [usize; 13] = [
    5, 7, 11, 23, 47, 97, 197, 397, 797, 1597, 3203, 6421, 12853,
];

pub const DEFAULT_CAPACITY: usize = 101;
const MAX_LOAD: f64 = 0.75;

/// FNV-1a fold over the key bytes.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_SEED;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A record storable in a [`ProbeTable`].
pub trait Record {
    /// Bytes folded into the probe hash. Must agree with the key bytes
    /// callers pass to `find`/`find_mut`/`remove` for the same logical key.
    fn probe_key(&self) -> Vec<u8>;

    /// Full key equality; resolves probe-hash collisions.
    fn same_key(&self, other: &Self) -> bool;
}

enum Slot<T> {
    Empty,
    Live(T),
    Tombstone,
}

impl<T> Slot<T> {
    fn is_free(&self) -> bool {
        matches!(self, Slot::Empty | Slot::Tombstone)
    }
}

pub struct ProbeTable<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T: Record> ProbeTable<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity.max(1)),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    /// Probe index of the live record matching `key`. Tombstones are
    /// skipped; a never-used slot terminates the scan.
    fn find_index(&self, key: &[u8], matches: &impl Fn(&T) -> bool) -> Option<usize> {
        let cap = self.slots.len();
        let home = (fnv1a(key) as usize) % cap;
        for step in 0..cap {
            let index = (home + step) % cap;
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Tombstone => continue,
                Slot::Live(record) => {
                    if matches(record) {
                        return Some(index);
                    }
                }
            }
        }
        None
    }

    pub fn find(&self, key: &[u8], matches: impl Fn(&T) -> bool) -> Option<&T> {
        let index = self.find_index(key, &matches)?;
        match &self.slots[index] {
            Slot::Live(record) => Some(record),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, key: &[u8], matches: impl Fn(&T) -> bool) -> Option<&mut T> {
        let index = self.find_index(key, &matches)?;
        match &mut self.slots[index] {
            Slot::Live(record) => Some(record),
            _ => None,
        }
    }

    /// Tombstone the live record matching `key`. The slot's storage is not
    /// reclaimed until the next rehash.
    pub fn remove(&mut self, key: &[u8], matches: impl Fn(&T) -> bool) -> bool {
        match self.find_index(key, &matches) {
            Some(index) => {
                self.slots[index] = Slot::Tombstone;
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Insert a record into the first free slot on its probe sequence.
    /// Key uniqueness is the caller's contract; use [`Self::upsert`] for
    /// overwrite-on-collision semantics.
    pub fn insert(&mut self, record: T) -> Result<()> {
        if self.load_factor() >= MAX_LOAD {
            self.rehash()?;
        }
        self.insert_unchecked(record)
    }

    /// Insert-or-overwrite keyed by full-key equality: an existing live
    /// record with the same key is replaced in place without growing the
    /// table.
    pub fn upsert(&mut self, record: T) -> Result<()> {
        if self.load_factor() >= MAX_LOAD {
            self.rehash()?;
        }
        let cap = self.slots.len();
        let home = (fnv1a(&record.probe_key()) as usize) % cap;
        for step in 0..cap {
            match &mut self.slots[(home + step) % cap] {
                // Reached a never-used slot: no record with this key exists.
                Slot::Empty => break,
                Slot::Tombstone => continue,
                Slot::Live(existing) => {
                    if existing.same_key(&record) {
                        *existing = record;
                        return Ok(());
                    }
                }
            }
        }
        self.insert_unchecked(record)
    }

    fn insert_unchecked(&mut self, record: T) -> Result<()> {
        let cap = self.slots.len();
        let home = (fnv1a(&record.probe_key()) as usize) % cap;
        for step in 0..cap {
            let index = (home + step) % cap;
            if self.slots[index].is_free() {
                self.slots[index] = Slot::Live(record);
                self.len += 1;
                return Ok(());
            }
        }
        Err(Error::Internal("hash table is full".into()))
    }

    /// Grow to the next capacity on the prime ladder (or double past its
    /// end) and reinsert every live record; tombstones are dropped. A
    /// reinsertion failure aborts the rehash.
    fn rehash(&mut self) -> Result<()> {
        let old_capacity = self.slots.len();
        let new_capacity = PRIMES
            .iter()
            .copied()
            .find(|prime| *prime > old_capacity)
            .unwrap_or(old_capacity * 2);

        let old_slots = std::mem::replace(&mut self.slots, empty_slots(new_capacity));
        self.len = 0;

        for slot in old_slots {
            if let Slot::Live(record) = slot {
                self.insert_unchecked(record)?;
            }
        }
        Ok(())
    }

    /// Live records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Live(record) => Some(record),
            _ => None,
        })
    }
}

impl<T: Record> Default for ProbeTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Slot<T>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}
