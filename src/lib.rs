//! https://riscv.org/technical/specifications/
//!
//! Instruction set simulator for a single RISC-V hart.
//!
//! Supports RV32 or RV64 (cargo feature `rv64`) with the M, A, F, D, Zicsr
//! and C extensions. Memory is not owned by the hart, it is passed into every
//! step through the [`platform::AddressSpace`] trait.

#[cfg(not(feature = "rv64"))]
pub type Uxlen = u32;
#[cfg(not(feature = "rv64"))]
pub type Ixlen = i32;
/// Twice the register width, used for the upper half of products.
#[cfg(not(feature = "rv64"))]
pub type Udxlen = u64;
#[cfg(not(feature = "rv64"))]
pub type Idxlen = i64;

#[cfg(feature = "rv64")]
pub type Uxlen = u64;
#[cfg(feature = "rv64")]
pub type Ixlen = i64;
#[cfg(feature = "rv64")]
pub type Udxlen = u128;
#[cfg(feature = "rv64")]
pub type Idxlen = i128;

/// Register width in bits.
pub const XLEN: u32 = Uxlen::BITS;

pub mod compressed;
pub mod decode;
pub mod execute;
pub mod harness;
pub mod platform;

pub use execute::Hart;
pub use platform::{AddressSpace, Memory};

/// Decodes and executes exactly one instruction.
///
/// `raw_word` is either a full 32 bit instruction or, when its two lowest
/// bits are not `0b11`, a compressed instruction in the lower half.
pub fn execute_instruction<A: AddressSpace + ?Sized>(
    hart: &mut Hart,
    memory: &mut A,
    raw_word: u32,
) {
    hart.execute_instruction(memory, raw_word);
}
