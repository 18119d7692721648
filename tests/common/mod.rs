//! Shared helpers: logger setup and a tiny assembler for instruction words.
#![allow(dead_code, unused_macros)]

use rvhart::{AddressSpace, Hart};

pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .format_timestamp(None)
        .is_test(true)
        .try_init();
}

/// Feeds `words` to the hart in order.
pub fn execute<A: AddressSpace>(hart: &mut Hart, memory: &mut A, words: &[u32]) {
    for &word in words {
        hart.execute_instruction(memory, word);
    }
}

/// Declares a test with a logger, a fresh hart and 1 MiB of memory.
macro_rules! hart_test {
    ($name:ident, |$hart:ident, $memory:ident| $body:block) => {
        #[test]
        fn $name() {
            common::init_logger();
            #[allow(unused_mut)]
            let mut $hart = rvhart::Hart::new();
            #[allow(unused_mut)]
            let mut $memory = rvhart::Memory::new();
            $body
        }
    };
}

// Formats

pub fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    funct7 << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

pub fn i_type(imm: i32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
    (imm as u32 & 0xfff) << 20 | rs1 << 15 | funct3 << 12 | rd << 7 | opcode
}

pub fn s_type(imm: i32, rs2: u32, rs1: u32, funct3: u32, opcode: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 5 & 0x7f) << 25 | rs2 << 20 | rs1 << 15 | funct3 << 12 | (imm & 0x1f) << 7 | opcode
}

pub fn b_type(imm: i32, rs2: u32, rs1: u32, funct3: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 12 & 1) << 31
        | (imm >> 5 & 0x3f) << 25
        | rs2 << 20
        | rs1 << 15
        | funct3 << 12
        | (imm >> 1 & 0xf) << 8
        | (imm >> 11 & 1) << 7
        | 0b110_0011
}

pub fn j_type(imm: i32, rd: u32) -> u32 {
    let imm = imm as u32;
    (imm >> 20 & 1) << 31
        | (imm >> 1 & 0x3ff) << 21
        | (imm >> 11 & 1) << 20
        | (imm >> 12 & 0xff) << 12
        | rd << 7
        | 0b110_1111
}

// Opcodes

pub const LOAD: u32 = 0b000_0011;
pub const LOAD_FP: u32 = 0b000_0111;
pub const MISC_MEM: u32 = 0b000_1111;
pub const OP_IMM: u32 = 0b001_0011;
pub const AUIPC: u32 = 0b001_0111;
pub const OP_IMM_32: u32 = 0b001_1011;
pub const STORE: u32 = 0b010_0011;
pub const STORE_FP: u32 = 0b010_0111;
pub const AMO: u32 = 0b010_1111;
pub const OP: u32 = 0b011_0011;
pub const LUI: u32 = 0b011_0111;
pub const OP_32: u32 = 0b011_1011;
pub const MADD: u32 = 0b100_0011;
pub const OP_FP: u32 = 0b101_0011;
pub const JALR: u32 = 0b110_0111;
pub const SYSTEM: u32 = 0b111_0011;

// Instructions

pub fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b000, rd, OP_IMM)
}

pub fn sltiu(rd: u32, rs1: u32, imm: i32) -> u32 {
    i_type(imm, rs1, 0b011, rd, OP_IMM)
}

pub fn srai(rd: u32, rs1: u32, shamt: u32) -> u32 {
    i_type((0b0100_0000_0000 | shamt) as i32, rs1, 0b101, rd, OP_IMM)
}

pub fn lui(rd: u32, imm20: u32) -> u32 {
    imm20 << 12 | rd << 7 | LUI
}

pub fn auipc(rd: u32, imm20: u32) -> u32 {
    imm20 << 12 | rd << 7 | AUIPC
}

/// `funct7`/`funct3` pairs of OP
pub mod op {
    pub const ADD: (u32, u32) = (0x00, 0b000);
    pub const SUB: (u32, u32) = (0x20, 0b000);
    pub const SLL: (u32, u32) = (0x00, 0b001);
    pub const SLT: (u32, u32) = (0x00, 0b010);
    pub const SLTU: (u32, u32) = (0x00, 0b011);
    pub const SRL: (u32, u32) = (0x00, 0b101);
    pub const SRA: (u32, u32) = (0x20, 0b101);
    pub const MUL: (u32, u32) = (0x01, 0b000);
    pub const MULH: (u32, u32) = (0x01, 0b001);
    pub const MULHSU: (u32, u32) = (0x01, 0b010);
    pub const MULHU: (u32, u32) = (0x01, 0b011);
    pub const DIV: (u32, u32) = (0x01, 0b100);
    pub const DIVU: (u32, u32) = (0x01, 0b101);
    pub const REM: (u32, u32) = (0x01, 0b110);
    pub const REMU: (u32, u32) = (0x01, 0b111);
}

pub fn op((funct7, funct3): (u32, u32), rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(funct7, rs2, rs1, funct3, rd, OP)
}

pub fn op_32((funct7, funct3): (u32, u32), rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(funct7, rs2, rs1, funct3, rd, OP_32)
}

pub fn beq(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b000)
}

pub fn bne(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b001)
}

pub fn blt(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b100)
}

pub fn bgeu(rs1: u32, rs2: u32, offset: i32) -> u32 {
    b_type(offset, rs2, rs1, 0b111)
}

pub fn jal(rd: u32, offset: i32) -> u32 {
    j_type(offset, rd)
}

pub fn jalr(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b000, rd, JALR)
}

pub fn lb(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b000, rd, LOAD)
}

pub fn lbu(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b100, rd, LOAD)
}

pub fn lh(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b001, rd, LOAD)
}

pub fn lw(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b010, rd, LOAD)
}

pub fn ld(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b011, rd, LOAD)
}

pub fn sb(rs2: u32, rs1: u32, offset: i32) -> u32 {
    s_type(offset, rs2, rs1, 0b000, STORE)
}

pub fn sw(rs2: u32, rs1: u32, offset: i32) -> u32 {
    s_type(offset, rs2, rs1, 0b010, STORE)
}

pub fn sd(rs2: u32, rs1: u32, offset: i32) -> u32 {
    s_type(offset, rs2, rs1, 0b011, STORE)
}

pub fn fence() -> u32 {
    MISC_MEM
}

pub fn fence_i() -> u32 {
    0b001 << 12 | MISC_MEM
}

/// AMO `funct5` values
pub mod amo {
    pub const ADD: u32 = 0b00000;
    pub const SWAP: u32 = 0b00001;
    pub const LR: u32 = 0b00010;
    pub const SC: u32 = 0b00011;
    pub const XOR: u32 = 0b00100;
    pub const OR: u32 = 0b01000;
    pub const AND: u32 = 0b01100;
    pub const MIN: u32 = 0b10000;
    pub const MAX: u32 = 0b10100;
    pub const MINU: u32 = 0b11000;
    pub const MAXU: u32 = 0b11100;
}

pub fn amo_w(funct5: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(funct5 << 2, rs2, rs1, 0b010, rd, AMO)
}

pub fn amo_d(funct5: u32, rd: u32, rs1: u32, rs2: u32) -> u32 {
    r_type(funct5 << 2, rs2, rs1, 0b011, rd, AMO)
}

pub fn csrrw(rd: u32, csr: u32, rs1: u32) -> u32 {
    i_type(csr as i32, rs1, 0b001, rd, SYSTEM)
}

pub fn csrrs(rd: u32, csr: u32, rs1: u32) -> u32 {
    i_type(csr as i32, rs1, 0b010, rd, SYSTEM)
}

pub fn csrrc(rd: u32, csr: u32, rs1: u32) -> u32 {
    i_type(csr as i32, rs1, 0b011, rd, SYSTEM)
}

pub fn csrrwi(rd: u32, csr: u32, zimm: u32) -> u32 {
    i_type(csr as i32, zimm, 0b101, rd, SYSTEM)
}

pub fn csrrci(rd: u32, csr: u32, zimm: u32) -> u32 {
    i_type(csr as i32, zimm, 0b111, rd, SYSTEM)
}

pub const ECALL: u32 = 0x0000_0073;
pub const EBREAK: u32 = 0x0010_0073;
pub const URET: u32 = 0x0020_0073;
pub const SRET: u32 = 0x1020_0073;
pub const MRET: u32 = 0x3020_0073;
pub const WFI: u32 = 0x1050_0073;
pub const SFENCE_VMA: u32 = 0x1200_0073;

/// Floating point operation, `rm` selects the rounding mode where it matters.
pub fn fp(funct7: u32, rd: u32, rs1: u32, rs2: u32, rm: u32) -> u32 {
    r_type(funct7, rs2, rs1, rm, rd, OP_FP)
}

pub fn fmadd_s(rd: u32, rs1: u32, rs2: u32, rs3: u32) -> u32 {
    rs3 << 27 | rs2 << 20 | rs1 << 15 | rd << 7 | MADD
}

pub fn flw(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b010, rd, LOAD_FP)
}

pub fn fsw(rs2: u32, rs1: u32, offset: i32) -> u32 {
    s_type(offset, rs2, rs1, 0b010, STORE_FP)
}

pub fn fld(rd: u32, rs1: u32, offset: i32) -> u32 {
    i_type(offset, rs1, 0b011, rd, LOAD_FP)
}

pub fn fsd(rs2: u32, rs1: u32, offset: i32) -> u32 {
    s_type(offset, rs2, rs1, 0b011, STORE_FP)
}
