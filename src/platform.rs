use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Uxlen;

use self::exception::{AccessFault, Direction};

pub mod exception {
    use std::fmt;

    use num_enum::IntoPrimitive;

    use super::PrivilegeLevel;
    use crate::Uxlen;

    /// Synchronous exception codes written to `mcause`/`scause`.
    /// Table 3.6 of the priviledged spec.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
    #[repr(u32)]
    pub enum TrapCause {
        InstructionAddressMisaligned = 0,
        InstructionAccessFault = 1,
        IllegalInstruction = 2,
        Breakpoint = 3,
        LoadAddressMisaligned = 4,
        LoadAccessFault = 5,
        StoreAddressMisaligned = 6,
        StoreAccessFault = 7,
        EnvironmentCallFromU = 8,
        EnvironmentCallFromS = 9,
        EnvironmentCallFromM = 11,
    }

    impl TrapCause {
        pub fn environment_call(from: PrivilegeLevel) -> TrapCause {
            match from {
                PrivilegeLevel::User => TrapCause::EnvironmentCallFromU,
                PrivilegeLevel::Supervisor => TrapCause::EnvironmentCallFromS,
                PrivilegeLevel::Machine => TrapCause::EnvironmentCallFromM,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Direction {
        Read,
        Write,
    }

    impl fmt::Display for Direction {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Direction::Read => f.write_str("read"),
                Direction::Write => f.write_str("write"),
            }
        }
    }

    /// An access that does not fit into the backing store.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    #[error("{direction} of {width} bytes at {address:#x} is out of bounds")]
    pub struct AccessFault {
        pub address: Uxlen,
        pub width: usize,
        pub direction: Direction,
    }
}

/// Byte addressable, little endian memory as seen by the hart.
///
/// Defines byte (1B), halfword(2B), word(4B) and doubleword(8B) accesses.
/// Accesses cannot fail from the hart's point of view, an implementation
/// decides what an inaccessible address reads as.
///
/// Only the byte accessors are required, the wider ones are composed from
/// them unless an implementation has something faster.
pub trait AddressSpace {
    fn read_byte(&self, addr: Uxlen) -> u8;

    fn write_byte(&mut self, addr: Uxlen, val: u8);

    fn read_halfword(&self, addr: Uxlen) -> u16 {
        u16::from_le_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    fn read_word(&self, addr: Uxlen) -> u32 {
        let low = self.read_halfword(addr) as u32;
        let high = self.read_halfword(addr.wrapping_add(2)) as u32;
        high << 16 | low
    }

    fn read_doubleword(&self, addr: Uxlen) -> u64 {
        let low = self.read_word(addr) as u64;
        let high = self.read_word(addr.wrapping_add(4)) as u64;
        high << 32 | low
    }

    fn write_halfword(&mut self, addr: Uxlen, val: u16) {
        for (offset, byte) in val.to_le_bytes().into_iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as Uxlen), byte);
        }
    }

    fn write_word(&mut self, addr: Uxlen, val: u32) {
        for (offset, byte) in val.to_le_bytes().into_iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as Uxlen), byte);
        }
    }

    fn write_doubleword(&mut self, addr: Uxlen, val: u64) {
        for (offset, byte) in val.to_le_bytes().into_iter().enumerate() {
            self.write_byte(addr.wrapping_add(offset as Uxlen), byte);
        }
    }
}

/// Flat main memory starting at address 0.
///
/// Out of bounds accesses through [`AddressSpace`] are logged, reads yield 0
/// and writes are dropped. The `try_` accessors report them instead.
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Memory {
    /// 1 MiB
    pub const DEFAULT_CAPACITY: usize = 1 << 20;

    pub fn new() -> Memory {
        Memory::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Memory {
        Memory {
            bytes: vec![0; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Copies `image` to `addr`, e.g. a program or its data.
    pub fn load(&mut self, addr: Uxlen, image: &[u8]) -> Result<(), AccessFault> {
        let index = self.address(addr, image.len(), Direction::Write)?;
        self.bytes[index..index + image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Index of `addr` if `width` bytes starting there are inside the store.
    fn address(&self, addr: Uxlen, width: usize, direction: Direction) -> Result<usize, AccessFault> {
        usize::try_from(addr)
            .ok()
            .filter(|index| {
                index
                    .checked_add(width)
                    .map_or(false, |end| end <= self.bytes.len())
            })
            .ok_or(AccessFault {
                address: addr,
                width,
                direction,
            })
    }

    fn read_bytes<const N: usize>(&self, addr: Uxlen) -> Result<[u8; N], AccessFault> {
        let index = self.address(addr, N, Direction::Read)?;
        let mut buf = [0; N];
        buf.copy_from_slice(&self.bytes[index..index + N]);
        Ok(buf)
    }

    fn write_bytes<const N: usize>(&mut self, addr: Uxlen, val: [u8; N]) -> Result<(), AccessFault> {
        let index = self.address(addr, N, Direction::Write)?;
        self.bytes[index..index + N].copy_from_slice(&val);
        Ok(())
    }

    pub fn try_read_byte(&self, addr: Uxlen) -> Result<u8, AccessFault> {
        self.read_bytes(addr).map(u8::from_le_bytes)
    }

    pub fn try_read_halfword(&self, addr: Uxlen) -> Result<u16, AccessFault> {
        self.read_bytes(addr).map(u16::from_le_bytes)
    }

    pub fn try_read_word(&self, addr: Uxlen) -> Result<u32, AccessFault> {
        self.read_bytes(addr).map(u32::from_le_bytes)
    }

    pub fn try_read_doubleword(&self, addr: Uxlen) -> Result<u64, AccessFault> {
        self.read_bytes(addr).map(u64::from_le_bytes)
    }

    pub fn try_write_byte(&mut self, addr: Uxlen, val: u8) -> Result<(), AccessFault> {
        self.write_bytes(addr, val.to_le_bytes())
    }

    pub fn try_write_halfword(&mut self, addr: Uxlen, val: u16) -> Result<(), AccessFault> {
        self.write_bytes(addr, val.to_le_bytes())
    }

    pub fn try_write_word(&mut self, addr: Uxlen, val: u32) -> Result<(), AccessFault> {
        self.write_bytes(addr, val.to_le_bytes())
    }

    pub fn try_write_doubleword(&mut self, addr: Uxlen, val: u64) -> Result<(), AccessFault> {
        self.write_bytes(addr, val.to_le_bytes())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

fn read_or_zero<T: Default>(access: Result<T, AccessFault>) -> T {
    access.unwrap_or_else(|fault| {
        log::error!("Memory {fault}, reading 0");
        T::default()
    })
}

fn discard_fault(access: Result<(), AccessFault>) {
    if let Err(fault) = access {
        log::error!("Memory {fault}, write discarded");
    }
}

impl AddressSpace for Memory {
    fn read_byte(&self, addr: Uxlen) -> u8 {
        read_or_zero(self.try_read_byte(addr))
    }

    fn write_byte(&mut self, addr: Uxlen, val: u8) {
        discard_fault(self.try_write_byte(addr, val))
    }

    fn read_halfword(&self, addr: Uxlen) -> u16 {
        read_or_zero(self.try_read_halfword(addr))
    }

    fn read_word(&self, addr: Uxlen) -> u32 {
        read_or_zero(self.try_read_word(addr))
    }

    fn read_doubleword(&self, addr: Uxlen) -> u64 {
        read_or_zero(self.try_read_doubleword(addr))
    }

    fn write_halfword(&mut self, addr: Uxlen, val: u16) {
        discard_fault(self.try_write_halfword(addr, val))
    }

    fn write_word(&mut self, addr: Uxlen, val: u32) {
        discard_fault(self.try_write_word(addr, val))
    }

    fn write_doubleword(&mut self, addr: Uxlen, val: u64) {
        discard_fault(self.try_write_doubleword(addr, val))
    }
}

/// Privilege levels, encoded as in the `mstatus.MPP` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PrivilegeLevel {
    User = 0,
    Supervisor = 1,
    Machine = 3,
}

/// CSR specifiers with a meaning to the hart.
pub mod csr {
    pub const FFLAGS: u16 = 0x001;
    pub const FRM: u16 = 0x002;
    pub const FCSR: u16 = 0x003;

    pub const SSTATUS: u16 = 0x100;
    pub const SEPC: u16 = 0x141;
    pub const SCAUSE: u16 = 0x142;

    pub const MSTATUS: u16 = 0x300;
    pub const MTVEC: u16 = 0x305;
    pub const MEPC: u16 = 0x341;
    pub const MCAUSE: u16 = 0x342;
}

/// Fields of `mstatus` and `sstatus`.
/// Section 3.1.6 of the priviledged spec.
pub mod status {
    pub const SIE: u32 = 1 << 1;
    pub const MIE: u32 = 1 << 3;
    pub const SPIE: u32 = 1 << 5;
    pub const MPIE: u32 = 1 << 7;
    pub const SPP: u32 = 1 << 8;
    pub const MPP_SHIFT: u32 = 11;
    pub const MPP: u32 = 0b11 << MPP_SHIFT;
}

/// The CSR address space.
///
/// Every one of the 4096 specifiers is backed by 32 bits of storage,
/// independent of XLEN. Side effects of particular registers are handled by
/// the instructions that use them.
pub struct Csr {
    regs: Box<[u32; 4096]>,
}

impl Csr {
    pub fn new() -> Csr {
        Csr {
            regs: Box::new([0; 4096]),
        }
    }

    /// The lower 12 bits of `addr` encode the CSR specifier.
    /// Section 2.2 of the priviledged Spec
    pub fn read(&self, addr: u16) -> u32 {
        self.regs[(addr & 0xfff) as usize]
    }

    /// The lower 12 bits of `addr` encode the CSR specifier.
    pub fn write(&mut self, addr: u16, value: u32) {
        self.regs[(addr & 0xfff) as usize] = value;
    }
}

impl Default for Csr {
    fn default() -> Self {
        Csr::new()
    }
}
