//! Virtual-to-physical address translation.
//!
//! The translation scheme is selected by the five-bit VM field of the
//! status register:
//! 1. **Direct** (0): physical = virtual.
//! 2. **Bounds** (1): one base/bound region for all accesses.
//! 3. **Split bounds** (2): fetches translate through an instruction
//!    region mapped at the upper half of the address space, data accesses
//!    through a separate data region in the lower half.
//! 4. **Paged** (8..=12): a radix page-table walk parameterized by entry
//!    width, per-level index width, and level count, covering the five
//!    standard page-table geometries.
//!
//! Every violation faults with the access kind's fault cause and the
//! untranslated virtual address. Walks update referenced/dirty bits in
//! place; the write-back happens under the same memory lock as the access
//! it accompanies.

use crate::common::{BitField, Exception};
use crate::memory::Memory;

use super::csr::{Csrs, Privilege};

/// Memory access kind.
///
/// Discriminants are the architectural misaligned-address cause codes;
/// the matching access/page fault is the discriminant plus one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Instruction fetch.
    Fetch = 0,
    /// Data load.
    Load = 4,
    /// Data store (and the read half of atomics).
    Store = 6,
}

impl Access {
    /// Misaligned-address exception for this access kind.
    pub fn misaligned(self, address: u64) -> Exception {
        match self {
            Self::Fetch => Exception::InstructionAddressMisaligned(address),
            Self::Load => Exception::LoadAddressMisaligned(address),
            Self::Store => Exception::StoreAddressMisaligned(address),
        }
    }

    /// Access/page fault for this access kind (cause = kind + 1).
    pub fn fault(self, address: u64) -> Exception {
        match self {
            Self::Fetch => Exception::InstructionAccessFault(address),
            Self::Load => Exception::LoadAccessFault(address),
            Self::Store => Exception::StoreAccessFault(address),
        }
    }
}

/// Direct mapping.
const VM_MBARE: u64 = 0;
/// Single bounds-checked region.
const VM_MBB: u64 = 1;
/// Split instruction/data bounds regions.
const VM_MBBID: u64 = 2;
/// First paged mode; 8..=12 select the five page-table geometries.
const VM_SV32: u64 = 8;
const VM_SV39: u64 = 9;
const VM_SV48: u64 = 10;
const VM_SV57: u64 = 11;
const VM_SV64: u64 = 12;

/// Byte offset within a page (all geometries use 4 KiB base pages).
const PAGE_OFFSET_BITS: u32 = 12;
/// Bit position of the physical page number inside an entry.
const PTE_PPN_OFFSET: u32 = 10;
/// Referenced bit.
const PTE_REFERENCED: u64 = 1 << 5;
/// Dirty bit.
const PTE_DIRTY: u64 = 1 << 6;

/// Shape of one paged-translation geometry.
struct Geometry {
    /// Entry width in bytes.
    pte_bytes: u32,
    /// Width of the top-level (widest) virtual index chunk.
    top_bits: u32,
    /// Width of every lower-level index chunk.
    index_bits: u32,
    /// Deepest level index; the walk starts here and counts down to zero.
    max_level: u32,
}

impl Geometry {
    fn of(vm: u64) -> Option<Self> {
        let (pte_bytes, top_bits, index_bits, max_level) = match vm {
            VM_SV32 => (4, 12, 10, 1),
            VM_SV39 => (8, 20, 9, 2),
            VM_SV48 => (8, 11, 9, 3),
            VM_SV57 => (8, 16, 9, 4),
            VM_SV64 => (8, 15, 13, 5),
            _ => return None,
        };
        Some(Self {
            pte_bytes,
            top_bits,
            index_bits,
            max_level,
        })
    }
}

/// Translates a virtual address for the given access kind.
///
/// The effective privilege is the previous-privilege stack entry whenever
/// the memory-privilege override is set, and for every access that is not
/// a machine-level fetch.
///
/// # Errors
///
/// The access kind's fault (cause = kind + 1) with the untranslated
/// virtual address on any bounds, validity, depth, or permission
/// violation.
pub fn translate(
    csrs: &Csrs,
    memory: &mut Memory,
    access: Access,
    virtual_address: u64,
) -> Result<u64, Exception> {
    let mut privilege = csrs.privilege();
    if privilege != Privilege::Machine || access != Access::Fetch || csrs.mprv() {
        privilege = csrs.previous_privilege();
    }

    match csrs.vm() {
        VM_MBARE => Ok(virtual_address),
        VM_MBB => {
            if virtual_address >= csrs.mbound {
                return Err(access.fault(virtual_address));
            }
            Ok(virtual_address.wrapping_add(csrs.mbase))
        }
        VM_MBBID => {
            let half = 1 << (csrs.config().xlen.bits() - 1);
            if access == Access::Fetch {
                if virtual_address < half {
                    return Err(access.fault(virtual_address));
                }
                let offset = virtual_address - half;
                if offset >= csrs.mibound {
                    return Err(access.fault(virtual_address));
                }
                Ok(offset.wrapping_add(csrs.mibase))
            } else {
                if virtual_address >= half || virtual_address >= csrs.mdbound {
                    return Err(access.fault(virtual_address));
                }
                Ok(virtual_address.wrapping_add(csrs.mdbase))
            }
        }
        vm => match Geometry::of(vm) {
            Some(geometry) => walk(csrs, memory, &geometry, privilege, access, virtual_address),
            None => Err(access.fault(virtual_address)),
        },
    }
}

/// Walks the page table rooted at the page-table-base CSR.
fn walk(
    csrs: &Csrs,
    memory: &mut Memory,
    geometry: &Geometry,
    privilege: Privilege,
    access: Access,
    virtual_address: u64,
) -> Result<u64, Exception> {
    let fault = || access.fault(virtual_address);
    let mut level = geometry.max_level;
    let mut table = csrs.sptbr;

    let (entry, entry_address) = loop {
        let idx = virtual_address.bits(
            level * geometry.index_bits + PAGE_OFFSET_BITS,
            geometry.index_bits,
        );
        let address = table.wrapping_add(idx * u64::from(geometry.pte_bytes));
        let entry = memory
            .load(address, geometry.pte_bytes)
            .ok_or_else(fault)?;
        if entry & 1 == 0 {
            return Err(fault());
        }
        if entry.bits(1, 5) >= 2 {
            break (entry, address);
        }
        if level == 0 {
            // Non-leaf entry at the deepest level; the tree is malformed.
            return Err(fault());
        }
        level -= 1;
        table = entry.bits(
            PTE_PPN_OFFSET,
            geometry.top_bits + geometry.index_bits * geometry.max_level,
        ) << PAGE_OFFSET_BITS;
    };

    let kind = entry.bits(1, 5);
    match access {
        Access::Fetch => {
            let executable = kind & 2 != 0;
            let permitted = if privilege == Privilege::User {
                kind < 8 && executable
            } else {
                kind >= 6 && executable
            };
            if !permitted {
                return Err(fault());
            }
        }
        Access::Load => {
            if privilege == Privilege::User && kind >= 8 {
                return Err(fault());
            }
        }
        Access::Store => {
            if kind & 1 == 0 {
                return Err(fault());
            }
            if privilege == Privilege::User && kind >= 8 {
                return Err(fault());
            }
        }
    }

    let mut updated = entry | PTE_REFERENCED;
    if access == Access::Store {
        updated |= PTE_DIRTY;
    }
    if updated != entry {
        memory
            .store(entry_address, geometry.pte_bytes, updated)
            .ok_or_else(fault)?;
    }

    let offset_bits = PAGE_OFFSET_BITS + geometry.index_bits * level;
    let page_number = entry.bits(
        PTE_PPN_OFFSET + geometry.index_bits * level,
        geometry.top_bits + geometry.index_bits * (geometry.max_level - level),
    );
    Ok((page_number << offset_bits) | virtual_address.bits(0, offset_bits))
}
