//! Decoding of 32 bit instruction words.
//!
//! Chapter 2.3 (immediate encoding variants) and Chapter 24 (opcode map) of
//! the unprivileged spec. Decoding is a pure function over constant data,
//! there is no table to build before the first instruction.

const RV64: bool = cfg!(feature = "rv64");

/// Fields of an R type instruction not shared with the other formats.
pub(crate) struct RType {
    pub funct3: u8,
    pub funct7: u8,
}

impl From<u32> for RType {
    fn from(instr: u32) -> RType {
        RType {
            funct3: ((instr >> 12) & 0b111) as u8,
            funct7: ((instr >> 25) & 0b111_1111) as u8,
        }
    }
}

pub(crate) struct IType {
    pub funct3: u8,
    pub imm: i32,
}

impl From<u32> for IType {
    fn from(instr: u32) -> IType {
        IType {
            funct3: ((instr >> 12) & 0b111) as u8,
            // Shifting as i32 garantees sign extension
            imm: instr as i32 >> 20,
        }
    }
}

pub(crate) struct SType {
    pub funct3: u8,
    pub imm: i32,
}

impl From<u32> for SType {
    fn from(instr: u32) -> SType {
        // imm[11:5] sits in the funct7 slot, imm[4:0] in the rd slot.
        let offset = ((instr & 0xfe_00_00_00) as i32 >> 20) | ((instr >> 7) & 0b1_1111) as i32;
        SType {
            funct3: ((instr >> 12) & 0b111) as u8,
            imm: offset,
        }
    }
}

pub(crate) struct UType {
    pub imm: i32,
}

impl From<u32> for UType {
    fn from(instr: u32) -> UType {
        UType {
            // Already placed in the upper 20 bits
            imm: (instr & 0xff_ff_f0_00) as i32,
        }
    }
}

pub(crate) struct JType {
    pub imm: i32,
}

impl From<u32> for JType {
    fn from(instr: u32) -> JType {
        // Unlike `UType` the bits are somewhat manged and are not
        // aligned in the upper bits. They are bit 20 to bit 1,
        // with bit 0 being 0.
        let offset = ((instr & 0x80_00_00_00) as i32 >> 11)
            | ((instr & 0x7f_e0_00_00) >> 20) as i32
            | ((instr & 0x00_10_00_00) >> 9) as i32
            | (instr & 0x00_0f_f0_00) as i32;
        JType { imm: offset }
    }
}

pub(crate) struct BType {
    pub funct3: u8,
    pub imm: i32,
}

impl From<u32> for BType {
    fn from(instr: u32) -> BType {
        // Demange bits. Note that bit 31 is sign extended, & bit 0 is set to 0.
        let offset = ((instr & 0x80_00_00_00) as i32 >> 19)
            | ((instr & 0x7e_00_00_00) >> 20) as i32
            | ((instr & 0x00_00_0f_00) >> 7) as i32
            | ((instr & 0x00_00_00_80) << 4) as i32;
        BType {
            funct3: ((instr >> 12) & 0b111) as u8,
            imm: offset,
        }
    }
}

// From Chapter 24
pub mod opcode {
    pub const LOAD: u8 = 0b00_000_11;
    pub const LOAD_FP: u8 = 0b00_001_11;
    pub const MISC_MEM: u8 = 0b00_011_11;
    pub const OP_IMM: u8 = 0b00_100_11;
    pub const AUIPC: u8 = 0b00_101_11;
    pub const OP_IMM_32: u8 = 0b00_110_11;

    pub const STORE: u8 = 0b01_000_11;
    pub const STORE_FP: u8 = 0b01_001_11;
    pub const AMO: u8 = 0b01_011_11;
    pub const OP: u8 = 0b01_100_11;
    pub const LUI: u8 = 0b01_101_11;
    pub const OP_32: u8 = 0b01_110_11;

    pub const MADD: u8 = 0b10_000_11;
    pub const MSUB: u8 = 0b10_001_11;
    pub const NMSUB: u8 = 0b10_010_11;
    pub const NMADD: u8 = 0b10_011_11;
    pub const OP_FP: u8 = 0b10_100_11;

    pub const BRANCH: u8 = 0b11_000_11;
    pub const JALR: u8 = 0b11_001_11;
    pub const JAL: u8 = 0b11_011_11;
    pub const SYSTEM: u8 = 0b11_100_11;
}

pub fn get_opcode(instr: u32) -> u8 {
    (instr & 0b111_1111) as u8
}

/// Every operation the hart knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstKind {
    // RV32I register-register
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    // M
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    // Register-immediate
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    // Loads and stores
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Lwu,
    Ld,
    Sb,
    Sh,
    Sw,
    Sd,
    // Control transfer
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Jal,
    Jalr,
    Lui,
    Auipc,
    // System
    Fence,
    FenceI,
    SfenceVma,
    Wfi,
    Ecall,
    Ebreak,
    Mret,
    Sret,
    Uret,
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
    // A
    LrW,
    ScW,
    AmoswapW,
    AmoaddW,
    AmoxorW,
    AmoandW,
    AmoorW,
    AmominW,
    AmomaxW,
    AmominuW,
    AmomaxuW,
    LrD,
    ScD,
    AmoswapD,
    AmoaddD,
    AmoxorD,
    AmoandD,
    AmoorD,
    AmominD,
    AmomaxD,
    AmominuD,
    AmomaxuD,
    // F
    FmaddS,
    FmsubS,
    FnmsubS,
    FnmaddS,
    FaddS,
    FsubS,
    FmulS,
    FdivS,
    FsqrtS,
    FsgnjS,
    FsgnjnS,
    FsgnjxS,
    FminS,
    FmaxS,
    FeqS,
    FltS,
    FleS,
    FclassS,
    FcvtWS,
    FcvtWuS,
    FcvtLS,
    FcvtLuS,
    FcvtSW,
    FcvtSWu,
    FcvtSL,
    FcvtSLu,
    FmvXW,
    FmvWX,
    // D
    FmaddD,
    FmsubD,
    FnmsubD,
    FnmaddD,
    FaddD,
    FsubD,
    FmulD,
    FdivD,
    FsqrtD,
    FsgnjD,
    FsgnjnD,
    FsgnjxD,
    FminD,
    FmaxD,
    FeqD,
    FltD,
    FleD,
    FclassD,
    FcvtSD,
    FcvtDS,
    FcvtWD,
    FcvtWuD,
    FcvtLD,
    FcvtLuD,
    FcvtDW,
    FcvtDWu,
    FcvtDL,
    FcvtDLu,
    FmvXD,
    FmvDX,
    // Float memory
    Flw,
    Fsw,
    Fld,
    Fsd,
    // RV64 word operations
    Addiw,
    Slliw,
    Srliw,
    Sraiw,
    Addw,
    Subw,
    Sllw,
    Srlw,
    Sraw,
    Mulw,
    Divw,
    Divuw,
    Remw,
    Remuw,

    Unknown,
}

/// Instructions grouped by operand shape and PC behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    AluReg,
    AluImm,
    Load,
    Store,
    Branch,
    Jump,
    Upper,
    System,
    Atomic,
    FloatSingle,
    FloatDouble,
    FloatMem,
    Word,
    Unknown,
}

impl InstKind {
    pub const fn family(self) -> Family {
        use InstKind::*;
        match self {
            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And | Mul | Mulh | Mulhsu
            | Mulhu | Div | Divu | Rem | Remu => Family::AluReg,
            Addi | Slti | Sltiu | Xori | Ori | Andi | Slli | Srli | Srai => Family::AluImm,
            Lb | Lh | Lw | Lbu | Lhu | Lwu | Ld => Family::Load,
            Sb | Sh | Sw | Sd => Family::Store,
            Beq | Bne | Blt | Bge | Bltu | Bgeu => Family::Branch,
            Jal | Jalr => Family::Jump,
            Lui | Auipc => Family::Upper,
            Fence | FenceI | SfenceVma | Wfi | Ecall | Ebreak | Mret | Sret | Uret | Csrrw
            | Csrrs | Csrrc | Csrrwi | Csrrsi | Csrrci => Family::System,
            LrW | ScW | AmoswapW | AmoaddW | AmoxorW | AmoandW | AmoorW | AmominW | AmomaxW
            | AmominuW | AmomaxuW | LrD | ScD | AmoswapD | AmoaddD | AmoxorD | AmoandD
            | AmoorD | AmominD | AmomaxD | AmominuD | AmomaxuD => Family::Atomic,
            FmaddS | FmsubS | FnmsubS | FnmaddS | FaddS | FsubS | FmulS | FdivS | FsqrtS
            | FsgnjS | FsgnjnS | FsgnjxS | FminS | FmaxS | FeqS | FltS | FleS | FclassS
            | FcvtWS | FcvtWuS | FcvtLS | FcvtLuS | FcvtSW | FcvtSWu | FcvtSL | FcvtSLu
            | FmvXW | FmvWX => Family::FloatSingle,
            FmaddD | FmsubD | FnmsubD | FnmaddD | FaddD | FsubD | FmulD | FdivD | FsqrtD
            | FsgnjD | FsgnjnD | FsgnjxD | FminD | FmaxD | FeqD | FltD | FleD | FclassD
            | FcvtSD | FcvtDS | FcvtWD | FcvtWuD | FcvtLD | FcvtLuD | FcvtDW | FcvtDWu
            | FcvtDL | FcvtDLu | FmvXD | FmvDX => Family::FloatDouble,
            Flw | Fsw | Fld | Fsd => Family::FloatMem,
            Addiw | Slliw | Srliw | Sraiw | Addw | Subw | Sllw | Srlw | Sraw | Mulw | Divw
            | Divuw | Remw | Remuw => Family::Word,
            Unknown => Family::Unknown,
        }
    }
}

/// Normalized view of one instruction.
///
/// `imm` is the sign extended immediate of the instruction's format. For
/// shifts it holds the shift amount, for CSR instructions the 12 bit CSR
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub opcode: u8,
    pub rd: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub imm: i32,
    pub kind: InstKind,
}

/// Decodes a 32 bit instruction word.
///
/// Combinations that match no supported instruction decode to
/// [`InstKind::Unknown`].
pub fn decode(word: u32) -> DecodedInstruction {
    let mut decoded = DecodedInstruction {
        opcode: get_opcode(word),
        rd: ((word >> 7) & 0b1_1111) as u8,
        rs1: ((word >> 15) & 0b1_1111) as u8,
        rs2: ((word >> 20) & 0b1_1111) as u8,
        imm: IType::from(word).imm,
        kind: InstKind::Unknown,
    };

    decoded.kind = match decoded.opcode {
        opcode::LUI => {
            decoded.imm = UType::from(word).imm;
            InstKind::Lui
        }
        opcode::AUIPC => {
            decoded.imm = UType::from(word).imm;
            InstKind::Auipc
        }
        opcode::JAL => {
            decoded.imm = JType::from(word).imm;
            InstKind::Jal
        }
        opcode::JALR => match IType::from(word).funct3 {
            0b000 => InstKind::Jalr,
            _ => InstKind::Unknown,
        },
        opcode::BRANCH => {
            let instr = BType::from(word);
            decoded.imm = instr.imm;
            decode_branch(instr.funct3)
        }
        opcode::STORE => {
            let instr = SType::from(word);
            decoded.imm = instr.imm;
            decode_store(instr.funct3)
        }
        opcode::LOAD => decode_load(IType::from(word).funct3),
        opcode::OP_IMM => {
            let (kind, shamt) = decode_op_imm(word);
            if let Some(shamt) = shamt {
                decoded.imm = shamt;
            }
            kind
        }
        opcode::OP => {
            let instr = RType::from(word);
            decode_op(instr.funct7, instr.funct3)
        }
        opcode::OP_IMM_32 if RV64 => {
            let (kind, shamt) = decode_op_imm_32(word);
            if let Some(shamt) = shamt {
                decoded.imm = shamt;
            }
            kind
        }
        opcode::OP_32 if RV64 => {
            let instr = RType::from(word);
            decode_op_32(instr.funct7, instr.funct3)
        }
        opcode::MISC_MEM => match IType::from(word).funct3 {
            0b000 => InstKind::Fence,
            0b001 => InstKind::FenceI,
            _ => InstKind::Unknown,
        },
        opcode::SYSTEM => {
            // The CSR address space needs the zero extended field
            let funct12 = (word >> 20) & 0xfff;
            decoded.imm = funct12 as i32;
            decode_system(IType::from(word).funct3, funct12)
        }
        opcode::AMO => {
            let funct5 = ((word >> 27) & 0b1_1111) as u8;
            decode_amo(funct5, IType::from(word).funct3, decoded.rs2)
        }
        opcode::MADD | opcode::MSUB | opcode::NMSUB | opcode::NMADD => {
            decode_fused(decoded.opcode, ((word >> 25) & 0b11) as u8)
        }
        opcode::OP_FP => {
            let instr = RType::from(word);
            decode_op_fp(instr.funct7, instr.funct3, decoded.rs2)
        }
        opcode::LOAD_FP => match IType::from(word).funct3 {
            0b010 => InstKind::Flw,
            0b011 => InstKind::Fld,
            _ => InstKind::Unknown,
        },
        opcode::STORE_FP => {
            let instr = SType::from(word);
            decoded.imm = instr.imm;
            match instr.funct3 {
                0b010 => InstKind::Fsw,
                0b011 => InstKind::Fsd,
                _ => InstKind::Unknown,
            }
        }
        _ => InstKind::Unknown,
    };

    decoded
}

fn decode_branch(funct3: u8) -> InstKind {
    match funct3 {
        0b000 => InstKind::Beq,
        0b001 => InstKind::Bne,
        0b100 => InstKind::Blt,
        0b101 => InstKind::Bge,
        0b110 => InstKind::Bltu,
        0b111 => InstKind::Bgeu,
        _ => InstKind::Unknown,
    }
}

fn decode_store(funct3: u8) -> InstKind {
    match funct3 {
        0b000 => InstKind::Sb,
        0b001 => InstKind::Sh,
        0b010 => InstKind::Sw,
        0b011 if RV64 => InstKind::Sd,
        _ => InstKind::Unknown,
    }
}

fn decode_load(funct3: u8) -> InstKind {
    match funct3 {
        0b000 => InstKind::Lb,
        0b001 => InstKind::Lh,
        0b010 => InstKind::Lw,
        0b100 => InstKind::Lbu,
        0b101 => InstKind::Lhu,
        0b011 if RV64 => InstKind::Ld,
        0b110 if RV64 => InstKind::Lwu,
        _ => InstKind::Unknown,
    }
}

/// Returns the kind and, for shifts, the shift amount replacing the immediate.
fn decode_op_imm(word: u32) -> (InstKind, Option<i32>) {
    let instr = IType::from(word);
    // On RV64 the shift amount takes one bit of funct7, leaving funct6.
    let (shamt, funct) = if RV64 {
        ((word >> 20) & 0b11_1111, (word >> 26) & 0b11_1111)
    } else {
        ((word >> 20) & 0b1_1111, (word >> 25) & 0b111_1111)
    };
    // SRAI sets bit 30 in both layouts
    let arith = if RV64 { 0b01_0000 } else { 0b010_0000 };

    match instr.funct3 {
        0b000 => (InstKind::Addi, None),
        0b010 => (InstKind::Slti, None),
        0b011 => (InstKind::Sltiu, None),
        0b100 => (InstKind::Xori, None),
        0b110 => (InstKind::Ori, None),
        0b111 => (InstKind::Andi, None),
        0b001 if funct == 0 => (InstKind::Slli, Some(shamt as i32)),
        0b101 if funct == 0 => (InstKind::Srli, Some(shamt as i32)),
        0b101 if funct == arith => (InstKind::Srai, Some(shamt as i32)),
        _ => (InstKind::Unknown, None),
    }
}

fn decode_op_imm_32(word: u32) -> (InstKind, Option<i32>) {
    let funct3 = IType::from(word).funct3;
    let funct7 = RType::from(word).funct7;
    let shamt = ((word >> 20) & 0b1_1111) as i32;
    match (funct7, funct3) {
        (_, 0b000) => (InstKind::Addiw, None),
        (0b000_0000, 0b001) => (InstKind::Slliw, Some(shamt)),
        (0b000_0000, 0b101) => (InstKind::Srliw, Some(shamt)),
        (0b010_0000, 0b101) => (InstKind::Sraiw, Some(shamt)),
        _ => (InstKind::Unknown, None),
    }
}

fn decode_op(funct7: u8, funct3: u8) -> InstKind {
    match (funct7, funct3) {
        (0x00, 0b000) => InstKind::Add,
        (0x20, 0b000) => InstKind::Sub,
        (0x00, 0b001) => InstKind::Sll,
        (0x00, 0b010) => InstKind::Slt,
        (0x00, 0b011) => InstKind::Sltu,
        (0x00, 0b100) => InstKind::Xor,
        (0x00, 0b101) => InstKind::Srl,
        (0x20, 0b101) => InstKind::Sra,
        (0x00, 0b110) => InstKind::Or,
        (0x00, 0b111) => InstKind::And,

        (0x01, 0b000) => InstKind::Mul,
        (0x01, 0b001) => InstKind::Mulh,
        (0x01, 0b010) => InstKind::Mulhsu,
        (0x01, 0b011) => InstKind::Mulhu,
        (0x01, 0b100) => InstKind::Div,
        (0x01, 0b101) => InstKind::Divu,
        (0x01, 0b110) => InstKind::Rem,
        (0x01, 0b111) => InstKind::Remu,
        _ => InstKind::Unknown,
    }
}

fn decode_op_32(funct7: u8, funct3: u8) -> InstKind {
    match (funct7, funct3) {
        (0x00, 0b000) => InstKind::Addw,
        (0x20, 0b000) => InstKind::Subw,
        (0x00, 0b001) => InstKind::Sllw,
        (0x00, 0b101) => InstKind::Srlw,
        (0x20, 0b101) => InstKind::Sraw,

        (0x01, 0b000) => InstKind::Mulw,
        (0x01, 0b100) => InstKind::Divw,
        (0x01, 0b101) => InstKind::Divuw,
        (0x01, 0b110) => InstKind::Remw,
        (0x01, 0b111) => InstKind::Remuw,
        _ => InstKind::Unknown,
    }
}

fn decode_system(funct3: u8, funct12: u32) -> InstKind {
    match funct3 {
        0b000 => match funct12 {
            0x000 => InstKind::Ecall,
            0x001 => InstKind::Ebreak,
            0x002 => InstKind::Uret,
            0x102 => InstKind::Sret,
            0x302 => InstKind::Mret,
            0x105 => InstKind::Wfi,
            _ if funct12 >> 5 == 0x09 => InstKind::SfenceVma,
            // Remaining funct12 values are treated as fences
            _ => InstKind::Fence,
        },
        0b001 => InstKind::Csrrw,
        0b010 => InstKind::Csrrs,
        0b011 => InstKind::Csrrc,
        0b101 => InstKind::Csrrwi,
        0b110 => InstKind::Csrrsi,
        0b111 => InstKind::Csrrci,
        _ => InstKind::Unknown,
    }
}

fn decode_amo(funct5: u8, funct3: u8, rs2: u8) -> InstKind {
    use InstKind::*;
    let word = match funct3 {
        0b010 => true,
        0b011 if RV64 => false,
        _ => return Unknown,
    };
    let (w, d) = match funct5 {
        0b00010 if rs2 == 0 => (LrW, LrD),
        0b00011 => (ScW, ScD),
        0b00001 => (AmoswapW, AmoswapD),
        0b00000 => (AmoaddW, AmoaddD),
        0b00100 => (AmoxorW, AmoxorD),
        0b01100 => (AmoandW, AmoandD),
        0b01000 => (AmoorW, AmoorD),
        0b10000 => (AmominW, AmominD),
        0b10100 => (AmomaxW, AmomaxD),
        0b11000 => (AmominuW, AmominuD),
        0b11100 => (AmomaxuW, AmomaxuD),
        _ => return Unknown,
    };
    if word {
        w
    } else {
        d
    }
}

fn decode_fused(op: u8, funct2: u8) -> InstKind {
    use InstKind::*;
    match (op, funct2) {
        (opcode::MADD, 0b00) => FmaddS,
        (opcode::MSUB, 0b00) => FmsubS,
        (opcode::NMSUB, 0b00) => FnmsubS,
        (opcode::NMADD, 0b00) => FnmaddS,
        (opcode::MADD, 0b01) => FmaddD,
        (opcode::MSUB, 0b01) => FmsubD,
        (opcode::NMSUB, 0b01) => FnmsubD,
        (opcode::NMADD, 0b01) => FnmaddD,
        _ => Unknown,
    }
}

/// OP-FP is selected by funct7, with funct3 or rs2 as a secondary selector
/// depending on the instruction group.
fn decode_op_fp(funct7: u8, funct3: u8, rs2: u8) -> InstKind {
    use InstKind::*;
    match (funct7, funct3, rs2) {
        (0x00, _, _) => FaddS,
        (0x04, _, _) => FsubS,
        (0x08, _, _) => FmulS,
        (0x0c, _, _) => FdivS,
        (0x2c, _, 0) => FsqrtS,
        (0x10, 0b000, _) => FsgnjS,
        (0x10, 0b001, _) => FsgnjnS,
        (0x10, 0b010, _) => FsgnjxS,
        (0x14, 0b000, _) => FminS,
        (0x14, 0b001, _) => FmaxS,
        (0x50, 0b010, _) => FeqS,
        (0x50, 0b001, _) => FltS,
        (0x50, 0b000, _) => FleS,
        (0x60, _, 0) => FcvtWS,
        (0x60, _, 1) => FcvtWuS,
        (0x60, _, 2) if RV64 => FcvtLS,
        (0x60, _, 3) if RV64 => FcvtLuS,
        (0x68, _, 0) => FcvtSW,
        (0x68, _, 1) => FcvtSWu,
        (0x68, _, 2) if RV64 => FcvtSL,
        (0x68, _, 3) if RV64 => FcvtSLu,
        (0x70, 0b000, 0) => FmvXW,
        (0x70, 0b001, 0) => FclassS,
        (0x78, 0b000, 0) => FmvWX,

        (0x01, _, _) => FaddD,
        (0x05, _, _) => FsubD,
        (0x09, _, _) => FmulD,
        (0x0d, _, _) => FdivD,
        (0x2d, _, 0) => FsqrtD,
        (0x11, 0b000, _) => FsgnjD,
        (0x11, 0b001, _) => FsgnjnD,
        (0x11, 0b010, _) => FsgnjxD,
        (0x15, 0b000, _) => FminD,
        (0x15, 0b001, _) => FmaxD,
        (0x20, _, 1) => FcvtSD,
        (0x21, _, 0) => FcvtDS,
        (0x51, 0b010, _) => FeqD,
        (0x51, 0b001, _) => FltD,
        (0x51, 0b000, _) => FleD,
        (0x61, _, 0) => FcvtWD,
        (0x61, _, 1) => FcvtWuD,
        (0x61, _, 2) if RV64 => FcvtLD,
        (0x61, _, 3) if RV64 => FcvtLuD,
        (0x69, _, 0) => FcvtDW,
        (0x69, _, 1) => FcvtDWu,
        (0x69, _, 2) if RV64 => FcvtDL,
        (0x69, _, 3) if RV64 => FcvtDLu,
        (0x71, 0b000, 0) if RV64 => FmvXD,
        (0x71, 0b001, 0) => FclassD,
        (0x79, 0b000, 0) if RV64 => FmvDX,
        _ => Unknown,
    }
}
