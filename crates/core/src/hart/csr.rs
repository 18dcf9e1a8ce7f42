//! Control and status registers.
//!
//! The bank holds the full register complement across four privilege
//! tiers. Reads and writes cascade through the tiers from least to most
//! privileged: an index that does not resolve at or below the caller's
//! tier falls through, and crossing into a tier above the current
//! privilege signals an illegal instruction. This mirrors the address-map
//! convention where each tier owns fixed index ranges.
//!
//! The status register packs a three-entry privilege stack in its low
//! twelve bits: entry `n` occupies bits `[3n..3n+3]` as an
//! interrupt-enable bit plus a two-bit privilege. Trap entry pushes onto
//! the stack, trap return pops it.

use crate::common::{BitField, Exception};
use crate::config::{Config, Extensions, Xlen};

/// CSR address map (12-bit indices).
#[allow(missing_docs)]
pub mod index {
    /// Accumulated floating-point exception flags.
    pub const FFLAGS: u16 = 0x001;
    /// Dynamic floating-point rounding mode.
    pub const FRM: u16 = 0x002;
    /// Combined floating-point control and status.
    pub const FCSR: u16 = 0x003;

    pub const CYCLE: u16 = 0xC00;
    pub const TIME: u16 = 0xC01;
    pub const INSTRET: u16 = 0xC02;
    pub const CYCLEH: u16 = 0xC80;
    pub const TIMEH: u16 = 0xC81;
    pub const INSTRETH: u16 = 0xC82;

    pub const SSTATUS: u16 = 0x100;
    pub const STVEC: u16 = 0x101;
    pub const SIE: u16 = 0x104;
    pub const STIMECMP: u16 = 0x121;
    pub const SSCRATCH: u16 = 0x140;
    pub const SEPC: u16 = 0x141;
    pub const SCAUSE: u16 = 0x142;
    pub const SBADADDR: u16 = 0x143;
    pub const SIP: u16 = 0x144;
    pub const SPTBR: u16 = 0x180;
    pub const SASID: u16 = 0x181;
    pub const STIME: u16 = 0xD01;
    pub const STIMEH: u16 = 0xD81;
    pub const CYCLEW: u16 = 0x900;
    pub const TIMEW: u16 = 0x901;
    pub const INSTRETW: u16 = 0x902;
    pub const CYCLEHW: u16 = 0x980;
    pub const TIMEHW: u16 = 0x981;
    pub const INSTRETHW: u16 = 0x982;

    pub const HSTATUS: u16 = 0x200;
    pub const HTVEC: u16 = 0x201;
    pub const HTDELEG: u16 = 0x202;
    pub const HTIMECMP: u16 = 0x221;
    pub const HSCRATCH: u16 = 0x240;
    pub const HEPC: u16 = 0x241;
    pub const HCAUSE: u16 = 0x242;
    pub const HBADADDR: u16 = 0x243;
    pub const HTIME: u16 = 0xE01;
    pub const HTIMEH: u16 = 0xE81;
    pub const STIMEW: u16 = 0xA01;
    pub const STIMEHW: u16 = 0xA81;

    pub const MCPUID: u16 = 0xF00;
    pub const MIMPID: u16 = 0xF01;
    pub const MHARTID: u16 = 0xF10;
    pub const MSTATUS: u16 = 0x300;
    pub const MTVEC: u16 = 0x301;
    pub const MTDELEG: u16 = 0x302;
    pub const MIE: u16 = 0x304;
    pub const MTIMECMP: u16 = 0x321;
    pub const MSCRATCH: u16 = 0x340;
    pub const MEPC: u16 = 0x341;
    pub const MCAUSE: u16 = 0x342;
    pub const MBADADDR: u16 = 0x343;
    pub const MIP: u16 = 0x344;
    pub const MBASE: u16 = 0x380;
    pub const MBOUND: u16 = 0x381;
    pub const MIBASE: u16 = 0x382;
    pub const MIBOUND: u16 = 0x383;
    pub const MDBASE: u16 = 0x384;
    pub const MDBOUND: u16 = 0x385;
    pub const MTIME: u16 = 0x701;
    pub const MTIMEH: u16 = 0x741;
    pub const MTOHOST: u16 = 0x780;
    pub const MFROMHOST: u16 = 0x781;
    pub const HTIMEW: u16 = 0xB01;
    pub const HTIMEHW: u16 = 0xB81;
}

/// Privilege level, ordered least to most privileged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Privilege {
    User = 0,
    Supervisor = 1,
    Hypervisor = 2,
    Machine = 3,
}

impl Privilege {
    /// Decodes a two-bit privilege field.
    pub fn from_bits(bits: u64) -> Self {
        match bits & 3 {
            0 => Self::User,
            1 => Self::Supervisor,
            2 => Self::Hypervisor,
            _ => Self::Machine,
        }
    }
}

/// Bit offset of the current-privilege field in the status register.
const STATUS_PRV_OFFSET: u32 = 1;
/// Bit offset of the previous-privilege field (stack entry 1).
const STATUS_PRV1_OFFSET: u32 = 4;
/// Bit offset of the memory-privilege override flag.
const STATUS_MPRV_OFFSET: u32 = 16;
/// Bit offset of the five-bit virtualization-mode field.
const STATUS_VM_OFFSET: u32 = 17;
/// Width of the three-entry privilege stack window.
const STATUS_STACK_BITS: u32 = 12;

/// Bits of the status register visible through the supervisor view.
const SSTATUS_MASK: u64 = 0x1_F019;

/// Writable bits of the supervisor interrupt-enable register.
const SIE_MASK: u64 = 0x22;
/// Writable bits of the supervisor interrupt-pending register.
const SIP_MASK: u64 = 0x2;
/// Software-writable bits of the machine interrupt-pending register.
const MIP_MASK: u64 = 0xE;

/// The control and status register bank of one hart.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct Csrs {
    config: Config,

    /// Accumulated floating-point exception flags (5 bits).
    pub fflags: u64,
    /// Dynamic rounding-mode field (3 bits).
    pub frm: u64,

    pub cycle: u64,
    pub time: u64,
    pub instret: u64,

    /// Packed status word: privilege stack, MPRV, VM field.
    pub status: u64,

    pub stvec: u64,
    pub sie: u64,
    pub stimecmp: u64,
    pub stime: u64,
    pub sscratch: u64,
    pub sepc: u64,
    pub scause: u64,
    pub sbadaddr: u64,
    pub sip: u64,
    pub sptbr: u64,
    pub sasid: u64,

    pub htvec: u64,
    pub htdeleg: u64,
    pub htimecmp: u64,
    pub htime: u64,
    pub hscratch: u64,
    pub hepc: u64,
    pub hcause: u64,
    pub hbadaddr: u64,

    pub mcpuid: u64,
    pub mimpid: u64,
    pub mhartid: u64,
    pub mtvec: u64,
    pub mtdeleg: u64,
    pub mie: u64,
    pub mtimecmp: u64,
    pub mtime: u64,
    pub mscratch: u64,
    pub mepc: u64,
    pub mcause: u64,
    pub mbadaddr: u64,
    pub mip: u64,
    pub mbase: u64,
    pub mbound: u64,
    pub mibase: u64,
    pub mibound: u64,
    pub mdbase: u64,
    pub mdbound: u64,
    pub mtohost: u64,
    pub mfromhost: u64,
}

impl Csrs {
    /// Constructs the bank in its post-reset state.
    pub fn new(config: Config) -> Self {
        let mut csrs = Self::zeroed(config);
        csrs.reset();
        csrs
    }

    /// Restores architectural defaults and reseeds the identification
    /// registers.
    ///
    /// The status register starts at Machine privilege with interrupts
    /// disabled and one stack entry per reachable lower tier; the machine
    /// trap vector defaults to `0x100`.
    pub fn reset(&mut self) {
        *self = Self::zeroed(self.config);

        self.status = 6;
        for level in 1..self.config.levels() {
            self.status |= 1 << (u32::from(level) * 3);
        }
        self.mtvec = 0x100;
        self.mcpuid = self.config.isa_id();
        self.mimpid = 0;
        self.mhartid = self.config.hart_id;
    }

    fn zeroed(config: Config) -> Self {
        Self {
            config,
            fflags: 0,
            frm: 0,
            cycle: 0,
            time: 0,
            instret: 0,
            status: 0,
            stvec: 0,
            sie: 0,
            stimecmp: 0,
            stime: 0,
            sscratch: 0,
            sepc: 0,
            scause: 0,
            sbadaddr: 0,
            sip: 0,
            sptbr: 0,
            sasid: 0,
            htvec: 0,
            htdeleg: 0,
            htimecmp: 0,
            htime: 0,
            hscratch: 0,
            hepc: 0,
            hcause: 0,
            hbadaddr: 0,
            mcpuid: 0,
            mimpid: 0,
            mhartid: 0,
            mtvec: 0,
            mtdeleg: 0,
            mie: 0,
            mtimecmp: 0,
            mtime: 0,
            mscratch: 0,
            mepc: 0,
            mcause: 0,
            mbadaddr: 0,
            mip: 0,
            mbase: 0,
            mbound: 0,
            mibase: 0,
            mibound: 0,
            mdbase: 0,
            mdbound: 0,
            mtohost: 0,
            mfromhost: 0,
        }
    }

    /// The configuration this bank was constructed with.
    pub(crate) fn config(&self) -> Config {
        self.config
    }

    /// Current privilege level, from the status register.
    pub fn privilege(&self) -> Privilege {
        Privilege::from_bits(self.status.bits(STATUS_PRV_OFFSET, 2))
    }

    /// Privilege level of the previous stack entry.
    pub fn previous_privilege(&self) -> Privilege {
        Privilege::from_bits(self.status.bits(STATUS_PRV1_OFFSET, 2))
    }

    /// Replaces the current privilege field without touching the stack.
    pub fn set_privilege(&mut self, privilege: Privilege) {
        self.status
            .set_bits(privilege as u64, STATUS_PRV_OFFSET, 2);
    }

    /// Memory-privilege override flag.
    pub fn mprv(&self) -> bool {
        self.status.bits(STATUS_MPRV_OFFSET, 1) != 0
    }

    /// Virtualization-mode selector (five bits).
    pub fn vm(&self) -> u64 {
        self.status.bits(STATUS_VM_OFFSET, 5)
    }

    /// Pushes a trap entry onto the status stack: the existing window
    /// shifts up one entry, the new bottom entry holds `target` with
    /// interrupts disabled, and the memory-privilege override is cleared.
    pub fn push_privilege(&mut self, target: Privilege) {
        let window = self.status.bits(0, STATUS_STACK_BITS - 3);
        self.status.set_bits(window, 3, STATUS_STACK_BITS - 3);
        self.status.set_bits((target as u64) << 1, 0, 3);
        self.status.set_bits(0, STATUS_MPRV_OFFSET, 1);
    }

    /// Pops the status stack on trap return. The vacated top entry is
    /// refilled with user mode (interrupts enabled) when user mode is
    /// configured, machine mode otherwise.
    pub fn pop_privilege(&mut self) {
        let window = self.status.bits(3, STATUS_STACK_BITS - 3);
        self.status.set_bits(window, 0, STATUS_STACK_BITS);
        let refill = if self.config.extensions.has(Extensions::U) {
            1
        } else {
            7
        };
        let top = (u32::from(self.config.levels()) - 1) * 3;
        self.status.set_bits(refill, top, 3);
    }

    /// Combined float control/status view.
    fn fcsr(&self) -> u64 {
        self.fflags | (self.frm << 5)
    }

    fn counter_read(&self, value: u64) -> u64 {
        value.bits(0, self.config.xlen.bits())
    }

    /// Reads the high half of a counter; RV32 only.
    fn counter_high(&self, value: u64) -> Result<u64, Exception> {
        if self.config.xlen.bits() > 32 {
            return Err(Exception::IllegalInstruction);
        }
        Ok(value.bits(32, 32))
    }

    fn counter_write(target: &mut u64, value: u64, xlen: Xlen) {
        target.set_bits(value, 0, xlen.bits());
    }

    fn counter_write_high(target: &mut u64, value: u64, xlen: Xlen) -> Result<(), Exception> {
        if xlen.bits() > 32 {
            return Err(Exception::IllegalInstruction);
        }
        target.set_bits(value, 32, 32);
        Ok(())
    }

    /// Supervisor view mask over the status register.
    fn sstatus_mask(&self) -> u64 {
        SSTATUS_MASK | (1 << (self.config.xlen.bits() - 1))
    }

    /// Reads a CSR, cascading through the privilege tiers.
    ///
    /// # Errors
    ///
    /// [`Exception::IllegalInstruction`] for an unknown index, an index
    /// above the caller's privilege, or a counter half that does not exist
    /// at the configured width.
    pub fn read(&self, idx: u16) -> Result<u64, Exception> {
        let privilege = self.privilege();

        match idx {
            index::FFLAGS => return Ok(self.fflags),
            index::FRM => return Ok(self.frm),
            index::FCSR => return Ok(self.fcsr()),
            index::CYCLE => return Ok(self.counter_read(self.cycle)),
            index::TIME => return Ok(self.counter_read(self.time)),
            index::INSTRET => return Ok(self.counter_read(self.instret)),
            index::CYCLEH => return self.counter_high(self.cycle),
            index::TIMEH => return self.counter_high(self.time),
            index::INSTRETH => return self.counter_high(self.instret),
            _ if privilege == Privilege::User => {
                return Err(Exception::IllegalInstruction);
            }
            _ => {}
        }

        match idx {
            index::SSTATUS => return Ok(self.status & self.sstatus_mask()),
            index::STVEC => return Ok(self.stvec),
            index::SIE => return Ok(self.sie & SIE_MASK),
            index::STIMECMP => return Ok(self.stimecmp),
            index::STIME | index::STIMEW => return Ok(self.counter_read(self.stime)),
            index::STIMEH | index::STIMEHW => return self.counter_high(self.stime),
            index::SSCRATCH => return Ok(self.sscratch),
            index::SEPC => return Ok(self.sepc),
            index::SCAUSE => return Ok(self.scause),
            index::SBADADDR => return Ok(self.sbadaddr),
            index::SIP => return Ok(self.sip & SIP_MASK),
            index::SPTBR => return Ok(self.sptbr),
            index::SASID => return Ok(self.sasid),
            index::CYCLEW => return Ok(self.counter_read(self.cycle)),
            index::TIMEW => return Ok(self.counter_read(self.time)),
            index::INSTRETW => return Ok(self.counter_read(self.instret)),
            index::CYCLEHW => return self.counter_high(self.cycle),
            index::TIMEHW => return self.counter_high(self.time),
            index::INSTRETHW => return self.counter_high(self.instret),
            _ if privilege == Privilege::Supervisor => {
                return Err(Exception::IllegalInstruction);
            }
            _ => {}
        }

        match idx {
            index::HSTATUS => return Ok(self.status),
            index::HTVEC => return Ok(self.htvec),
            index::HTDELEG => return Ok(self.htdeleg),
            index::HTIMECMP => return Ok(self.htimecmp),
            index::HTIME | index::HTIMEW => return Ok(self.counter_read(self.htime)),
            index::HTIMEH | index::HTIMEHW => return self.counter_high(self.htime),
            index::HSCRATCH => return Ok(self.hscratch),
            index::HEPC => return Ok(self.hepc),
            index::HCAUSE => return Ok(self.hcause),
            index::HBADADDR => return Ok(self.hbadaddr),
            _ if privilege == Privilege::Hypervisor => {
                return Err(Exception::IllegalInstruction);
            }
            _ => {}
        }

        match idx {
            index::MCPUID => Ok(self.mcpuid),
            index::MIMPID => Ok(self.mimpid),
            index::MHARTID => Ok(self.mhartid),
            index::MSTATUS => Ok(self.status),
            index::MTVEC => Ok(self.mtvec),
            index::MTDELEG => Ok(self.mtdeleg),
            index::MIE => Ok(self.mie),
            index::MTIMECMP => Ok(self.mtimecmp),
            index::MTIME => Ok(self.counter_read(self.mtime)),
            index::MTIMEH => self.counter_high(self.mtime),
            index::MSCRATCH => Ok(self.mscratch),
            index::MEPC => Ok(self.mepc),
            index::MCAUSE => Ok(self.mcause),
            index::MBADADDR => Ok(self.mbadaddr),
            index::MIP => Ok(self.mip),
            index::MBASE => Ok(self.mbase),
            index::MBOUND => Ok(self.mbound),
            index::MIBASE => Ok(self.mibase),
            index::MIBOUND => Ok(self.mibound),
            index::MDBASE => Ok(self.mdbase),
            index::MDBOUND => Ok(self.mdbound),
            index::MTOHOST => Ok(self.mtohost),
            index::MFROMHOST => Ok(self.mfromhost),
            _ => Err(Exception::IllegalInstruction),
        }
    }

    /// Writes a CSR, cascading through the privilege tiers.
    ///
    /// # Errors
    ///
    /// [`Exception::IllegalInstruction`] for an unknown index, an index
    /// above the caller's privilege, a read-only identification register,
    /// or a hardwired counter alias.
    pub fn write(&mut self, idx: u16, value: u64) -> Result<(), Exception> {
        let privilege = self.privilege();
        let xlen = self.config.xlen;

        match idx {
            index::FFLAGS => {
                self.fflags = value.bits(0, 5);
                return Ok(());
            }
            index::FRM => {
                self.frm = value.bits(0, 3);
                return Ok(());
            }
            index::FCSR => {
                self.fflags = value.bits(0, 5);
                self.frm = value.bits(5, 3);
                return Ok(());
            }
            index::CYCLE | index::TIME | index::INSTRET | index::CYCLEH | index::TIMEH
            | index::INSTRETH => return Err(Exception::IllegalInstruction),
            _ if privilege == Privilege::User => {
                return Err(Exception::IllegalInstruction);
            }
            _ => {}
        }

        match idx {
            index::SSTATUS => {
                let mask = self.sstatus_mask();
                self.status = (self.status & !mask) | (value & mask);
                return Ok(());
            }
            index::STVEC => {
                self.stvec = value;
                return Ok(());
            }
            index::SIE => {
                self.sie = (self.sie & !SIE_MASK) | (value & SIE_MASK);
                return Ok(());
            }
            index::STIMECMP => {
                self.stimecmp = value;
                return Ok(());
            }
            index::STIME | index::STIMEH => return Err(Exception::IllegalInstruction),
            index::SSCRATCH => {
                self.sscratch = value;
                return Ok(());
            }
            index::SEPC => {
                self.sepc = value;
                return Ok(());
            }
            index::SCAUSE => {
                self.scause = value;
                return Ok(());
            }
            index::SBADADDR => {
                self.sbadaddr = value;
                return Ok(());
            }
            index::SIP => {
                self.sip = (self.sip & !SIP_MASK) | (value & SIP_MASK);
                return Ok(());
            }
            index::SPTBR => {
                self.sptbr = value;
                return Ok(());
            }
            index::SASID => {
                self.sasid = value;
                return Ok(());
            }
            index::CYCLEW => {
                Self::counter_write(&mut self.cycle, value, xlen);
                return Ok(());
            }
            index::TIMEW => {
                Self::counter_write(&mut self.time, value, xlen);
                return Ok(());
            }
            index::INSTRETW => {
                Self::counter_write(&mut self.instret, value, xlen);
                return Ok(());
            }
            index::CYCLEHW => return Self::counter_write_high(&mut self.cycle, value, xlen),
            index::TIMEHW => return Self::counter_write_high(&mut self.time, value, xlen),
            index::INSTRETHW => {
                return Self::counter_write_high(&mut self.instret, value, xlen);
            }
            _ if privilege == Privilege::Supervisor => {
                return Err(Exception::IllegalInstruction);
            }
            _ => {}
        }

        match idx {
            index::HSTATUS => {
                self.status = value;
                return Ok(());
            }
            index::HTVEC => {
                self.htvec = value;
                return Ok(());
            }
            index::HTDELEG => {
                self.htdeleg = value;
                return Ok(());
            }
            index::HTIMECMP => {
                self.htimecmp = value;
                return Ok(());
            }
            index::HTIME | index::HTIMEH => return Err(Exception::IllegalInstruction),
            index::HSCRATCH => {
                self.hscratch = value;
                return Ok(());
            }
            index::HEPC => {
                self.hepc = value;
                return Ok(());
            }
            index::HCAUSE => {
                self.hcause = value;
                return Ok(());
            }
            index::HBADADDR => {
                self.hbadaddr = value;
                return Ok(());
            }
            index::STIMEW => {
                Self::counter_write(&mut self.stime, value, xlen);
                return Ok(());
            }
            index::STIMEHW => return Self::counter_write_high(&mut self.stime, value, xlen),
            _ if privilege == Privilege::Hypervisor => {
                return Err(Exception::IllegalInstruction);
            }
            _ => {}
        }

        match idx {
            index::MSTATUS => {
                self.status = value;
                Ok(())
            }
            index::MTVEC => {
                self.mtvec = value;
                Ok(())
            }
            index::MTDELEG => {
                self.mtdeleg = value;
                Ok(())
            }
            index::MIE => {
                self.mie = value;
                Ok(())
            }
            index::MTIMECMP => {
                self.mtimecmp = value;
                Ok(())
            }
            index::MTIME => {
                Self::counter_write(&mut self.mtime, value, xlen);
                Ok(())
            }
            index::MTIMEH => Self::counter_write_high(&mut self.mtime, value, xlen),
            index::MSCRATCH => {
                self.mscratch = value;
                Ok(())
            }
            index::MEPC => {
                self.mepc = value;
                Ok(())
            }
            index::MCAUSE => {
                self.mcause = value;
                Ok(())
            }
            index::MBADADDR => {
                self.mbadaddr = value;
                Ok(())
            }
            index::MIP => {
                self.mip = (self.mip & !MIP_MASK) | (value & MIP_MASK);
                Ok(())
            }
            index::MBASE => {
                self.mbase = value;
                Ok(())
            }
            index::MBOUND => {
                self.mbound = value;
                Ok(())
            }
            index::MIBASE => {
                self.mibase = value;
                Ok(())
            }
            index::MIBOUND => {
                self.mibound = value;
                Ok(())
            }
            index::MDBASE => {
                self.mdbase = value;
                Ok(())
            }
            index::MDBOUND => {
                self.mdbound = value;
                Ok(())
            }
            index::HTIMEW => {
                Self::counter_write(&mut self.htime, value, xlen);
                Ok(())
            }
            index::HTIMEHW => Self::counter_write_high(&mut self.htime, value, xlen),
            index::MTOHOST => {
                self.mtohost = value;
                Ok(())
            }
            index::MFROMHOST => {
                self.mfromhost = value;
                Ok(())
            }
            _ => Err(Exception::IllegalInstruction),
        }
    }
}
