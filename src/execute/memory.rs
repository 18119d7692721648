//! Loads, stores and the "A" extension (Chapter 8).

use super::{sign_extend_word, Hart, Next};
use crate::decode::{DecodedInstruction, InstKind};
use crate::platform::AddressSpace;
use crate::{Ixlen, Uxlen};

/// Read-modify-write operation of an AMO.
#[derive(Debug, Clone, Copy)]
enum AmoOp {
    Swap,
    Add,
    Xor,
    And,
    Or,
    Min,
    Max,
    Minu,
    Maxu,
}

impl AmoOp {
    /// Operands are sign extended to 64 bits, which keeps the unsigned
    /// ordering of word sized values intact.
    fn apply(self, old: u64, src: u64) -> u64 {
        match self {
            AmoOp::Swap => src,
            AmoOp::Add => old.wrapping_add(src),
            AmoOp::Xor => old ^ src,
            AmoOp::And => old & src,
            AmoOp::Or => old | src,
            AmoOp::Min => (old as i64).min(src as i64) as u64,
            AmoOp::Max => (old as i64).max(src as i64) as u64,
            AmoOp::Minu => old.min(src),
            AmoOp::Maxu => old.max(src),
        }
    }
}

impl Hart {
    /// Effective address `rs1 + imm`.
    fn effective_address(&self, instr: &DecodedInstruction) -> Uxlen {
        self.regs[instr.rs1 as usize].wrapping_add(instr.imm as Ixlen as Uxlen)
    }

    pub(super) fn execute_load<A: AddressSpace + ?Sized>(
        &mut self,
        memory: &mut A,
        instr: &DecodedInstruction,
    ) -> Next {
        let addr = self.effective_address(instr);

        let value = match instr.kind {
            InstKind::Lb => memory.read_byte(addr) as i8 as Ixlen as Uxlen,
            InstKind::Lh => memory.read_halfword(addr) as i16 as Ixlen as Uxlen,
            InstKind::Lw => sign_extend_word(memory.read_word(addr)),
            InstKind::Lbu => memory.read_byte(addr) as Uxlen,
            InstKind::Lhu => memory.read_halfword(addr) as Uxlen,
            InstKind::Lwu => memory.read_word(addr) as Uxlen,
            InstKind::Ld => memory.read_doubleword(addr) as Uxlen,
            kind => unreachable!("{kind:?} is not a load"),
        };

        self.write_reg(instr.rd, value);
        Next::Step
    }

    pub(super) fn execute_store<A: AddressSpace + ?Sized>(
        &mut self,
        memory: &mut A,
        instr: &DecodedInstruction,
    ) -> Next {
        let addr = self.effective_address(instr);
        let src = self.regs[instr.rs2 as usize];

        match instr.kind {
            InstKind::Sb => memory.write_byte(addr, src as u8),
            InstKind::Sh => memory.write_halfword(addr, src as u16),
            InstKind::Sw => memory.write_word(addr, src as u32),
            InstKind::Sd => memory.write_doubleword(addr, src as u64),
            kind => unreachable!("{kind:?} is not a store"),
        }
        Next::Step
    }

    /// LR/SC and the AMOs. The address is `rs1` without offset.
    pub(super) fn execute_atomic<A: AddressSpace + ?Sized>(
        &mut self,
        memory: &mut A,
        instr: &DecodedInstruction,
    ) -> Next {
        use InstKind::*;

        let addr = self.regs[instr.rs1 as usize];
        let src = self.regs[instr.rs2 as usize];

        let (op, word) = match instr.kind {
            LrW | LrD => {
                let value = self.load_linked(memory, addr, instr.kind == LrW);
                self.write_reg(instr.rd, value);
                return Next::Step;
            }
            ScW | ScD => {
                let failed = self.store_conditional(memory, addr, src, instr.kind == ScW);
                self.write_reg(instr.rd, failed as Uxlen);
                return Next::Step;
            }
            AmoswapW => (AmoOp::Swap, true),
            AmoaddW => (AmoOp::Add, true),
            AmoxorW => (AmoOp::Xor, true),
            AmoandW => (AmoOp::And, true),
            AmoorW => (AmoOp::Or, true),
            AmominW => (AmoOp::Min, true),
            AmomaxW => (AmoOp::Max, true),
            AmominuW => (AmoOp::Minu, true),
            AmomaxuW => (AmoOp::Maxu, true),
            AmoswapD => (AmoOp::Swap, false),
            AmoaddD => (AmoOp::Add, false),
            AmoxorD => (AmoOp::Xor, false),
            AmoandD => (AmoOp::And, false),
            AmoorD => (AmoOp::Or, false),
            AmominD => (AmoOp::Min, false),
            AmomaxD => (AmoOp::Max, false),
            AmominuD => (AmoOp::Minu, false),
            AmomaxuD => (AmoOp::Maxu, false),
            kind => unreachable!("{kind:?} is not an atomic operation"),
        };

        let old = if word {
            let old = memory.read_word(addr) as i32 as i64 as u64;
            let new = op.apply(old, src as u32 as i32 as i64 as u64);
            memory.write_word(addr, new as u32);
            old
        } else {
            let old = memory.read_doubleword(addr);
            let new = op.apply(old, src as u64);
            memory.write_doubleword(addr, new);
            old
        };

        // Word results are already sign extended
        self.write_reg(instr.rd, old as Uxlen);
        Next::Step
    }

    /// Loads and reserves `addr`. The reservation is taken even if the
    /// loaded value is discarded.
    fn load_linked<A: AddressSpace + ?Sized>(&mut self, memory: &mut A, addr: Uxlen, word: bool) -> Uxlen {
        self.reservation = Some(addr);
        if word {
            sign_extend_word(memory.read_word(addr))
        } else {
            memory.read_doubleword(addr) as Uxlen
        }
    }

    /// Returns `true` if the store failed. Every SC clears the reservation.
    fn store_conditional<A: AddressSpace + ?Sized>(
        &mut self,
        memory: &mut A,
        addr: Uxlen,
        src: Uxlen,
        word: bool,
    ) -> bool {
        let reserved = self.reservation.take() == Some(addr);
        if reserved {
            if word {
                memory.write_word(addr, src as u32);
            } else {
                memory.write_doubleword(addr, src as u64);
            }
        }
        !reserved
    }

    pub(super) fn execute_float_mem<A: AddressSpace + ?Sized>(
        &mut self,
        memory: &mut A,
        instr: &DecodedInstruction,
    ) -> Next {
        let addr = self.effective_address(instr);

        match instr.kind {
            InstKind::Flw => self.fregs[instr.rd as usize] = f32::from_bits(memory.read_word(addr)),
            InstKind::Fld => {
                self.dfregs[instr.rd as usize] = f64::from_bits(memory.read_doubleword(addr))
            }
            InstKind::Fsw => memory.write_word(addr, self.fregs[instr.rs2 as usize].to_bits()),
            InstKind::Fsd => {
                memory.write_doubleword(addr, self.dfregs[instr.rs2 as usize].to_bits())
            }
            kind => unreachable!("{kind:?} is not a floating point load or store"),
        }
        Next::Step
    }
}
