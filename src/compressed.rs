//! Chapter 16: "C" Standard Extension for Compressed Instructions
//!
//! Every 16 bit instruction is rewritten to the 32 bit instruction it stands
//! for and then goes through the regular decoder. Reserved encodings expand to
//! `0`, which the decoder reports as unknown.

use crate::decode::opcode;

const RV64: bool = cfg!(feature = "rv64");

/// Expands a 16 bit compressed instruction to its 32 bit equivalent.
pub fn expand(inst: u16) -> u32 {
    let funct3 = field(inst, 15, 13);
    match inst & 0b11 {
        0b00 => quadrant0(inst, funct3),
        0b01 => quadrant1(inst, funct3),
        0b10 => quadrant2(inst, funct3),
        // 0b11 marks a 32 bit instruction
        _ => 0,
    }
}

fn quadrant0(inst: u16, funct3: u32) -> u32 {
    let rs1 = creg(field(inst, 9, 7));
    // rd' and rs2' share the same slot
    let rd = creg(field(inst, 4, 2));

    // uimm[5:3] in 12:10, uimm[2|6] in 6:5 (word) or uimm[7:6] in 6:5 (double)
    let word_offset = field(inst, 12, 10) << 3 | field(inst, 6, 6) << 2 | field(inst, 5, 5) << 6;
    let double_offset = field(inst, 12, 10) << 3 | field(inst, 6, 5) << 6;

    match funct3 {
        // C.ADDI4SPN
        0b000 => {
            let imm = field(inst, 12, 11) << 4
                | field(inst, 10, 7) << 6
                | field(inst, 6, 6) << 2
                | field(inst, 5, 5) << 3;
            if imm == 0 {
                return 0;
            }
            i_type(imm, 2, 0b000, rd, opcode::OP_IMM)
        }
        // C.FLD
        0b001 => i_type(double_offset, rs1, 0b011, rd, opcode::LOAD_FP),
        // C.LW
        0b010 => i_type(word_offset, rs1, 0b010, rd, opcode::LOAD),
        // C.LD
        0b011 if RV64 => i_type(double_offset, rs1, 0b011, rd, opcode::LOAD),
        // C.FLW
        0b011 => i_type(word_offset, rs1, 0b010, rd, opcode::LOAD_FP),
        // C.FSD
        0b101 => s_type(double_offset, rd, rs1, 0b011, opcode::STORE_FP),
        // C.SW
        0b110 => s_type(word_offset, rd, rs1, 0b010, opcode::STORE),
        // C.SD
        0b111 if RV64 => s_type(double_offset, rd, rs1, 0b011, opcode::STORE),
        // C.FSW
        0b111 => s_type(word_offset, rd, rs1, 0b010, opcode::STORE_FP),
        _ => 0,
    }
}

fn quadrant1(inst: u16, funct3: u32) -> u32 {
    let rd = field(inst, 11, 7);
    // imm[5] in bit 12, imm[4:0] in 6:2
    let imm6 = sign_extend(field(inst, 12, 12) << 5 | field(inst, 6, 2), 6);

    match funct3 {
        // C.ADDI, C.NOP for rd = 0
        0b000 => i_type(imm6, rd, 0b000, rd, opcode::OP_IMM),
        // C.ADDIW
        0b001 if RV64 => {
            if rd == 0 {
                return 0;
            }
            i_type(imm6, rd, 0b000, rd, opcode::OP_IMM_32)
        }
        // C.JAL
        0b001 => j_type(jump_offset(inst), 1),
        // C.LI
        0b010 => i_type(imm6, 0, 0b000, rd, opcode::OP_IMM),
        // C.ADDI16SP
        0b011 if rd == 2 => {
            let imm = sign_extend(
                field(inst, 12, 12) << 9
                    | field(inst, 6, 6) << 4
                    | field(inst, 5, 5) << 6
                    | field(inst, 4, 3) << 7
                    | field(inst, 2, 2) << 5,
                10,
            );
            if imm == 0 {
                return 0;
            }
            i_type(imm, 2, 0b000, 2, opcode::OP_IMM)
        }
        // C.LUI
        0b011 => {
            if imm6 == 0 {
                return 0;
            }
            imm6 << 12 | rd << 7 | opcode::LUI as u32
        }
        0b100 => misc_alu(inst, imm6),
        // C.J
        0b101 => j_type(jump_offset(inst), 0),
        // C.BEQZ
        0b110 => b_type(branch_offset(inst), 0, creg(field(inst, 9, 7)), 0b000),
        // C.BNEZ
        _ => b_type(branch_offset(inst), 0, creg(field(inst, 9, 7)), 0b001),
    }
}

/// C.SRLI, C.SRAI, C.ANDI and the register-register arithmetic group.
fn misc_alu(inst: u16, imm6: u32) -> u32 {
    let rd = creg(field(inst, 9, 7));
    let rs2 = creg(field(inst, 4, 2));
    let shamt = imm6 & 0b11_1111;

    match field(inst, 11, 10) {
        0b00 | 0b01 if !RV64 && shamt >= 32 => 0,
        0b00 => i_type(shamt, rd, 0b101, rd, opcode::OP_IMM),
        0b01 => i_type(0b0100_0000_0000 | shamt, rd, 0b101, rd, opcode::OP_IMM),
        0b10 => i_type(imm6, rd, 0b111, rd, opcode::OP_IMM),
        _ => match (field(inst, 12, 12), field(inst, 6, 5)) {
            (0, 0b00) => r_type(0b010_0000, rs2, rd, 0b000, rd, opcode::OP),
            (0, 0b01) => r_type(0, rs2, rd, 0b100, rd, opcode::OP),
            (0, 0b10) => r_type(0, rs2, rd, 0b110, rd, opcode::OP),
            (0, 0b11) => r_type(0, rs2, rd, 0b111, rd, opcode::OP),
            (1, 0b00) if RV64 => r_type(0b010_0000, rs2, rd, 0b000, rd, opcode::OP_32),
            (1, 0b01) if RV64 => r_type(0, rs2, rd, 0b000, rd, opcode::OP_32),
            _ => 0,
        },
    }
}

fn quadrant2(inst: u16, funct3: u32) -> u32 {
    let rd = field(inst, 11, 7);
    let rs2 = field(inst, 6, 2);

    // uimm[5] in bit 12, the rest scaled by access size
    let word_load = field(inst, 12, 12) << 5 | field(inst, 6, 4) << 2 | field(inst, 3, 2) << 6;
    let double_load = field(inst, 12, 12) << 5 | field(inst, 6, 5) << 3 | field(inst, 4, 2) << 6;
    let word_store = field(inst, 12, 9) << 2 | field(inst, 8, 7) << 6;
    let double_store = field(inst, 12, 10) << 3 | field(inst, 9, 7) << 6;

    match funct3 {
        // C.SLLI
        0b000 => {
            let shamt = field(inst, 12, 12) << 5 | rs2;
            if rd == 0 || (!RV64 && shamt >= 32) {
                return 0;
            }
            i_type(shamt, rd, 0b001, rd, opcode::OP_IMM)
        }
        // C.FLDSP
        0b001 => i_type(double_load, 2, 0b011, rd, opcode::LOAD_FP),
        // C.LWSP
        0b010 => {
            if rd == 0 {
                return 0;
            }
            i_type(word_load, 2, 0b010, rd, opcode::LOAD)
        }
        // C.LDSP
        0b011 if RV64 => {
            if rd == 0 {
                return 0;
            }
            i_type(double_load, 2, 0b011, rd, opcode::LOAD)
        }
        // C.FLWSP
        0b011 => i_type(word_load, 2, 0b010, rd, opcode::LOAD_FP),
        0b100 => match (field(inst, 12, 12), rd, rs2) {
            // C.JR
            (0, 0, 0) => 0,
            (0, rs1, 0) => i_type(0, rs1, 0b000, 0, opcode::JALR),
            // C.MV
            (0, rd, rs2) => r_type(0, rs2, 0, 0b000, rd, opcode::OP),
            // C.EBREAK
            (_, 0, 0) => 0x0010_0073,
            // C.JALR
            (_, rs1, 0) => i_type(0, rs1, 0b000, 1, opcode::JALR),
            // C.ADD
            (_, rd, rs2) => r_type(0, rs2, rd, 0b000, rd, opcode::OP),
        },
        // C.FSDSP
        0b101 => s_type(double_store, rs2, 2, 0b011, opcode::STORE_FP),
        // C.SWSP
        0b110 => s_type(word_store, rs2, 2, 0b010, opcode::STORE),
        // C.SDSP
        0b111 if RV64 => s_type(double_store, rs2, 2, 0b011, opcode::STORE),
        // C.FSWSP
        _ => s_type(word_store, rs2, 2, 0b010, opcode::STORE_FP),
    }
}

/// offset[11|4|9:8|10|6|7|3:1|5] of C.J and C.JAL
fn jump_offset(inst: u16) -> u32 {
    sign_extend(
        field(inst, 12, 12) << 11
            | field(inst, 11, 11) << 4
            | field(inst, 10, 9) << 8
            | field(inst, 8, 8) << 10
            | field(inst, 7, 7) << 6
            | field(inst, 6, 6) << 7
            | field(inst, 5, 3) << 1
            | field(inst, 2, 2) << 5,
        12,
    )
}

/// offset[8|4:3] in 12:10, offset[7:6|2:1|5] in 6:2
fn branch_offset(inst: u16) -> u32 {
    sign_extend(
        field(inst, 12, 12) << 8
            | field(inst, 11, 10) << 3
            | field(inst, 6, 5) << 6
            | field(inst, 4, 3) << 1
            | field(inst, 2, 2) << 5,
        9,
    )
}

/// Bits `hi` down to `lo` of `inst`, shifted to bit 0.
fn field(inst: u16, hi: u32, lo: u32) -> u32 {
    (inst as u32 >> lo) & ((1 << (hi - lo + 1)) - 1)
}

/// The three bit register fields address x8 to x15.
fn creg(bits: u32) -> u32 {
    8 + bits
}

fn sign_extend(val: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    ((val << shift) as i32 >> shift) as u32
}

fn i_type(imm: u32, rs1: u32, funct3: u32, rd: u32, op: u8) -> u32 {
    (imm & 0xfff) << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | op as u32
}

fn s_type(imm: u32, rs2: u32, rs1: u32, funct3: u32, op: u8) -> u32 {
    (imm >> 5 & 0x7f) << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | (imm & 0x1f) << 7 | op as u32
}

fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, op: u8) -> u32 {
    funct7 << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | op as u32
}

fn b_type(imm: u32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    (imm >> 12 & 1) << 31
        | (imm >> 5 & 0x3f) << 25
        | rs2 << 20
        | rs1 << 15
        | funct3 << 12
        | (imm >> 1 & 0xf) << 8
        | (imm >> 11 & 1) << 7
        | opcode::BRANCH as u32
}

fn j_type(imm: u32, rd: u32) -> u32 {
    (imm >> 20 & 1) << 31
        | (imm >> 1 & 0x3ff) << 21
        | (imm >> 11 & 1) << 20
        | (imm >> 12 & 0xff) << 12
        | rd << 7
        | opcode::JAL as u32
}
