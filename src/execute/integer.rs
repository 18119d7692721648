//! Integer computational and control transfer instructions.
//! Chapter 2.4 to 2.5 of the unprivileged spec, plus "M" (Chapter 7) and the
//! RV64 word variants.

use super::{sign_extend_word, Hart, Next};
use crate::decode::{DecodedInstruction, InstKind};
use crate::{Idxlen, Ixlen, Udxlen, Uxlen, XLEN};

impl Hart {
    /// Register-register operations of I and M.
    pub(super) fn execute_alu_reg(&mut self, instr: &DecodedInstruction) -> Next {
        let src1 = self.regs[instr.rs1 as usize];
        let src2 = self.regs[instr.rs2 as usize];

        let result = match instr.kind {
            InstKind::Add => src1.wrapping_add(src2),
            InstKind::Sub => src1.wrapping_sub(src2),
            // Shift amount is the lower log2(XLEN) bits of src2
            InstKind::Sll => src1.wrapping_shl(src2 as u32),
            InstKind::Srl => src1.wrapping_shr(src2 as u32),
            InstKind::Sra => (src1 as Ixlen).wrapping_shr(src2 as u32) as Uxlen,
            InstKind::Slt => ((src1 as Ixlen) < (src2 as Ixlen)) as Uxlen,
            InstKind::Sltu => (src1 < src2) as Uxlen,
            InstKind::Xor => src1 ^ src2,
            InstKind::Or => src1 | src2,
            InstKind::And => src1 & src2,

            InstKind::Mul => src1.wrapping_mul(src2),
            InstKind::Mulh => {
                let product = (src1 as Ixlen as Idxlen).wrapping_mul(src2 as Ixlen as Idxlen);
                (product >> XLEN) as Uxlen
            }
            InstKind::Mulhsu => {
                let product = (src1 as Ixlen as Idxlen).wrapping_mul(src2 as Udxlen as Idxlen);
                (product >> XLEN) as Uxlen
            }
            InstKind::Mulhu => {
                let product = (src1 as Udxlen).wrapping_mul(src2 as Udxlen);
                (product >> XLEN) as Uxlen
            }
            InstKind::Div => div(src1, src2),
            InstKind::Divu => divu(src1, src2),
            InstKind::Rem => rem(src1, src2),
            InstKind::Remu => remu(src1, src2),
            kind => unreachable!("{kind:?} is not a register-register operation"),
        };

        self.write_reg(instr.rd, result);
        Next::Step
    }

    /// Register-immediate operations. Shifts carry the shift amount in `imm`.
    pub(super) fn execute_alu_imm(&mut self, instr: &DecodedInstruction) -> Next {
        let src = self.regs[instr.rs1 as usize];
        let imm = instr.imm as Ixlen as Uxlen;

        let result = match instr.kind {
            InstKind::Addi => src.wrapping_add(imm),
            InstKind::Slti => ((src as Ixlen) < (imm as Ixlen)) as Uxlen,
            // Sign extended, then compared as unsigned
            InstKind::Sltiu => (src < imm) as Uxlen,
            InstKind::Xori => src ^ imm,
            InstKind::Ori => src | imm,
            InstKind::Andi => src & imm,
            InstKind::Slli => src.wrapping_shl(instr.imm as u32),
            InstKind::Srli => src.wrapping_shr(instr.imm as u32),
            InstKind::Srai => (src as Ixlen).wrapping_shr(instr.imm as u32) as Uxlen,
            kind => unreachable!("{kind:?} is not a register-immediate operation"),
        };

        self.write_reg(instr.rd, result);
        Next::Step
    }

    /// LUI and AUIPC. The immediate is sign extended on RV64.
    pub(super) fn execute_upper(&mut self, instr: &DecodedInstruction) -> Next {
        let imm = instr.imm as Ixlen as Uxlen;
        let result = match instr.kind {
            InstKind::Lui => imm,
            // Relative to the address of the AUIPC itself
            InstKind::Auipc => self.reg_pc.wrapping_add(imm),
            kind => unreachable!("{kind:?} is not an upper immediate operation"),
        };

        self.write_reg(instr.rd, result);
        Next::Step
    }

    pub(super) fn execute_branch(&mut self, instr: &DecodedInstruction) -> Next {
        let src1 = self.regs[instr.rs1 as usize];
        let src2 = self.regs[instr.rs2 as usize];

        let taken = match instr.kind {
            InstKind::Beq => src1 == src2,
            InstKind::Bne => src1 != src2,
            InstKind::Blt => (src1 as Ixlen) < (src2 as Ixlen),
            InstKind::Bge => (src1 as Ixlen) >= (src2 as Ixlen),
            InstKind::Bltu => src1 < src2,
            InstKind::Bgeu => src1 >= src2,
            kind => unreachable!("{kind:?} is not a branch"),
        };

        if taken {
            Next::Jump(self.reg_pc.wrapping_add(instr.imm as Ixlen as Uxlen))
        } else {
            Next::Step
        }
    }

    /// JAL and JALR link the address of the following instruction, which is
    /// `len` bytes after this one.
    pub(super) fn execute_jump(&mut self, instr: &DecodedInstruction, len: u8) -> Next {
        let link = self.reg_pc.wrapping_add(len as Uxlen);
        let offset = instr.imm as Ixlen as Uxlen;

        let target = match instr.kind {
            InstKind::Jal => self.reg_pc.wrapping_add(offset),
            // Computed before rd is written, rd may equal rs1
            InstKind::Jalr => self.regs[instr.rs1 as usize].wrapping_add(offset) & !1,
            kind => unreachable!("{kind:?} is not a jump"),
        };

        self.write_reg(instr.rd, link);
        Next::Jump(target)
    }

    /// RV64 operations on the lower 32 bits, results are sign extended.
    pub(super) fn execute_word(&mut self, instr: &DecodedInstruction) -> Next {
        let src1 = self.regs[instr.rs1 as usize] as u32;
        let src2 = self.regs[instr.rs2 as usize] as u32;
        let imm = instr.imm as u32;

        let result = match instr.kind {
            InstKind::Addiw => src1.wrapping_add(imm),
            InstKind::Slliw => src1.wrapping_shl(imm),
            InstKind::Srliw => src1.wrapping_shr(imm),
            InstKind::Sraiw => (src1 as i32).wrapping_shr(imm) as u32,
            InstKind::Addw => src1.wrapping_add(src2),
            InstKind::Subw => src1.wrapping_sub(src2),
            // Only the lower 5 bits of src2 count
            InstKind::Sllw => src1.wrapping_shl(src2),
            InstKind::Srlw => src1.wrapping_shr(src2),
            InstKind::Sraw => (src1 as i32).wrapping_shr(src2) as u32,
            InstKind::Mulw => src1.wrapping_mul(src2),
            InstKind::Divw => divw(src1, src2),
            InstKind::Divuw => divuw(src1, src2),
            InstKind::Remw => remw(src1, src2),
            InstKind::Remuw => remuw(src1, src2),
            kind => unreachable!("{kind:?} is not a word operation"),
        };

        self.write_reg(instr.rd, sign_extend_word(result));
        Next::Step
    }
}

// Division never traps. Division by zero and the overflow of MIN / -1 have
// defined results, Table 7.1.

fn div(dividend: Uxlen, divisor: Uxlen) -> Uxlen {
    if divisor == 0 {
        Uxlen::MAX
    } else {
        // wrapping_div gives MIN for MIN / -1
        (dividend as Ixlen).wrapping_div(divisor as Ixlen) as Uxlen
    }
}

fn divu(dividend: Uxlen, divisor: Uxlen) -> Uxlen {
    dividend.checked_div(divisor).unwrap_or(Uxlen::MAX)
}

fn rem(dividend: Uxlen, divisor: Uxlen) -> Uxlen {
    if divisor == 0 {
        dividend
    } else {
        (dividend as Ixlen).wrapping_rem(divisor as Ixlen) as Uxlen
    }
}

fn remu(dividend: Uxlen, divisor: Uxlen) -> Uxlen {
    dividend.checked_rem(divisor).unwrap_or(dividend)
}

fn divw(dividend: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        u32::MAX
    } else {
        (dividend as i32).wrapping_div(divisor as i32) as u32
    }
}

fn divuw(dividend: u32, divisor: u32) -> u32 {
    dividend.checked_div(divisor).unwrap_or(u32::MAX)
}

fn remw(dividend: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        dividend
    } else {
        (dividend as i32).wrapping_rem(divisor as i32) as u32
    }
}

fn remuw(dividend: u32, divisor: u32) -> u32 {
    dividend.checked_rem(divisor).unwrap_or(dividend)
}
