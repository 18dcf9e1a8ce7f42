//! Physical memory backend.
//!
//! A flat little-endian byte buffer sized to a power of two, plus the
//! reservation seals that back the load-reserved/store-conditional pair:
//! 1. **Accessors:** Width-parameterized loads and stores, bounds-checked
//!    against the buffer.
//! 2. **Seals:** A set of `(address, width)` reservations. Every store
//!    erases the seals it overlaps, so a conditional store succeeds only
//!    when no write touched the sealed range in between.
//! 3. **Sharing:** [`SharedMemory`] wraps the backend for multi-hart use;
//!    one lock acquisition spans an entire atomic read-modify-write.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// A memory reservation: starting address and width in bytes.
pub type Seal = (u64, u8);

/// Memory backend shared between harts.
pub type SharedMemory = Arc<Mutex<Memory>>;

/// Emulated physical memory.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    seals: BTreeSet<Seal>,
}

impl Memory {
    /// Allocates a zeroed buffer of `2^size_log2` bytes.
    pub fn new(size_log2: u32) -> Self {
        Self {
            data: vec![0; 1 << size_log2],
            seals: BTreeSet::new(),
        }
    }

    /// Wraps a new backend for sharing between harts.
    pub fn shared(size_log2: u32) -> SharedMemory {
        Arc::new(Mutex::new(Self::new(size_log2)))
    }

    /// Buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Loads `width` bytes little-endian, or `None` when the range falls
    /// outside the buffer.
    pub fn load(&self, address: u64, width: u32) -> Option<u64> {
        let start = usize::try_from(address).ok()?;
        let end = start.checked_add(width as usize)?;
        let bytes = self.data.get(start..end)?;
        let mut value = 0u64;
        for (index, byte) in bytes.iter().enumerate() {
            value |= u64::from(*byte) << (index * 8);
        }
        Some(value)
    }

    /// Stores the low `width` bytes of `value` little-endian, erasing every
    /// seal the range overlaps. `None` when the range falls outside the
    /// buffer, in which case nothing is written or unsealed.
    pub fn store(&mut self, address: u64, width: u32, value: u64) -> Option<()> {
        let start = usize::try_from(address).ok()?;
        let end = start.checked_add(width as usize)?;
        let bytes = self.data.get_mut(start..end)?;
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = (value >> (index * 8)) as u8;
        }
        self.invalidate_overlapping(address, width as u64);
        Some(())
    }

    /// Reads a byte range, or `None` when it falls outside the buffer.
    pub fn read_bytes(&self, address: u64, length: usize) -> Option<&[u8]> {
        let start = usize::try_from(address).ok()?;
        self.data.get(start..start.checked_add(length)?)
    }

    /// Writes a byte range (used for program loading), erasing overlapped
    /// seals. `None` when the range falls outside the buffer.
    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Option<()> {
        let start = usize::try_from(address).ok()?;
        let end = start.checked_add(bytes.len())?;
        self.data.get_mut(start..end)?.copy_from_slice(bytes);
        self.invalidate_overlapping(address, bytes.len() as u64);
        Some(())
    }

    /// Replaces a hart's reservations: the entries in `held` leave the seal
    /// set, `next` enters it, and `held` is updated to match.
    pub fn seal(&mut self, held: &mut BTreeSet<Seal>, next: BTreeSet<Seal>) {
        for entry in held.iter() {
            let _ = self.seals.remove(entry);
        }
        held.clear();
        for entry in next {
            let _ = held.insert(entry);
            let _ = self.seals.insert(entry);
        }
    }

    /// Consumes a reservation. `true` when the exact seal was still
    /// present, meaning no store touched the range since it was placed.
    pub fn unseal(&mut self, entry: Seal) -> bool {
        self.seals.remove(&entry)
    }

    fn invalidate_overlapping(&mut self, address: u64, length: u64) {
        self.seals.retain(|&(start, width)| {
            let seal_end = start + u64::from(width);
            let store_end = address + length;
            address >= seal_end || start >= store_end
        });
    }
}
