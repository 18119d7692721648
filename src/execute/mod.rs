use crate::compressed;
use crate::decode::{self, DecodedInstruction, Family};
use crate::platform::{csr, AddressSpace, Csr, PrivilegeLevel};
use crate::Uxlen;

mod float;
mod integer;
mod memory;
mod system;

/// Where execution continues after an instruction.
enum Next {
    /// The instruction following this one.
    Step,
    /// An explicit target set by a branch, jump or trap.
    Jump(Uxlen),
}

/// Hardware Thread
///
pub struct Hart {
    reg_pc: Uxlen,
    /// x0 is always zero
    /// x1 is usually the return address
    /// x2 is usually the stack pointer
    /// # INVARIANT
    /// regs[0] is always zero!
    regs: [Uxlen; 32],

    /// Single and double precision registers are separate banks,
    /// values are not NaN-boxed.
    fregs: [f32; 32],
    dfregs: [f64; 32],

    csr_space: Csr,
    privilege: PrivilegeLevel,

    /// Address reserved by the last LR, consumed by SC.
    reservation: Option<Uxlen>,
}

impl Hart {
    /// A hart in its reset state: everything zero, PC at address 0,
    /// running in machine mode.
    pub fn new() -> Hart {
        Hart {
            reg_pc: 0,
            regs: [0; 32],
            fregs: [0.0; 32],
            dfregs: [0.0; 32],
            csr_space: Csr::new(),
            privilege: PrivilegeLevel::Machine,
            reservation: None,
        }
    }

    /// Decodes and executes one instruction and advances the PC.
    ///
    /// Words whose lowest two bits are not `0b11` hold a 16 bit compressed
    /// instruction in their lower half, which advances the PC by 2.
    pub fn execute_instruction<A: AddressSpace + ?Sized>(&mut self, memory: &mut A, raw_word: u32) {
        let (word, len) = if raw_word & 0b11 != 0b11 {
            let parcel = raw_word as u16;
            let word = compressed::expand(parcel);
            if word == 0 {
                log::warn!(
                    "Reserved compressed instruction {:#06x} at {:#x}, skipped",
                    parcel,
                    self.reg_pc
                );
                self.reg_pc = self.reg_pc.wrapping_add(2);
                return;
            }
            (word, 2)
        } else {
            (raw_word, 4)
        };

        let instr = decode::decode(word);
        self.execute(memory, &instr, word, len);
    }

    /// Applies an already decoded instruction to the architectural state.
    ///
    /// Backed by `execute_xxx` functions per instruction family. Advancing
    /// the PC by `len` is done here unless the family returned an explicit
    /// target. `raw_word` is the 32 bit encoding of `instr`, some floating
    /// point instructions take fields from it the decoder does not keep.
    /// Register indices of `instr` are taken modulo 32.
    pub fn execute<A: AddressSpace + ?Sized>(
        &mut self,
        memory: &mut A,
        instr: &DecodedInstruction,
        raw_word: u32,
        len: u8,
    ) {
        let instr = &DecodedInstruction {
            rd: instr.rd & 0b1_1111,
            rs1: instr.rs1 & 0b1_1111,
            rs2: instr.rs2 & 0b1_1111,
            ..*instr
        };
        log::trace!("{:#010x}: {:?} ({:#010x})", self.reg_pc, instr.kind, raw_word);

        let next = match instr.kind.family() {
            Family::AluReg | Family::AluImm | Family::Upper | Family::Word if instr.rd == 0 => {
                self.hint(raw_word);
                Next::Step
            }
            Family::AluReg => self.execute_alu_reg(instr),
            Family::AluImm => self.execute_alu_imm(instr),
            Family::Upper => self.execute_upper(instr),
            Family::Word => self.execute_word(instr),
            Family::Branch => self.execute_branch(instr),
            Family::Jump => self.execute_jump(instr, len),
            Family::Load => self.execute_load(memory, instr),
            Family::Store => self.execute_store(memory, instr),
            Family::Atomic => self.execute_atomic(memory, instr),
            Family::FloatMem => self.execute_float_mem(memory, instr),
            Family::FloatSingle => self.execute_float_single(instr, raw_word),
            Family::FloatDouble => self.execute_float_double(instr, raw_word),
            Family::System => self.execute_system(instr),
            Family::Unknown => {
                log::warn!(
                    "Unknown instruction {:#010x} at {:#x}, skipped",
                    raw_word,
                    self.reg_pc
                );
                Next::Step
            }
        };

        self.reg_pc = match next {
            Next::Step => self.reg_pc.wrapping_add(len as Uxlen),
            Next::Jump(target) => target,
        };
    }

    /// This function will be called for Integer Computational Instructions
    /// with `rd` = 0.
    /// Note: execution continues without executing the underlying
    /// instruction, to garantee `regs[0]` is never written to!
    ///
    /// `ADDI x0, x0, 0` is considered the canonical NOP.
    ///
    /// See Section 2.9: Hint instruction
    fn hint(&mut self, instr: u32) {
        if instr == decode::opcode::OP_IMM as u32 {
            // NOP encoded as `ADDI x0, x0, 0`
            return;
        }

        log::trace!("Ignored hint instruction {instr:#010x}");
    }

    /// Register write that keeps x0 hardwired to zero.
    fn write_reg(&mut self, dest: u8, value: Uxlen) {
        if dest != 0 {
            self.regs[dest as usize] = value;
        }
    }

    pub fn reg(&self, index: u8) -> Uxlen {
        self.regs[(index & 0b1_1111) as usize]
    }

    /// Writes to x0 are ignored.
    pub fn set_reg(&mut self, index: u8, value: Uxlen) {
        self.write_reg(index & 0b1_1111, value);
    }

    pub fn freg(&self, index: u8) -> f32 {
        self.fregs[(index & 0b1_1111) as usize]
    }

    pub fn set_freg(&mut self, index: u8, value: f32) {
        self.fregs[(index & 0b1_1111) as usize] = value;
    }

    pub fn dfreg(&self, index: u8) -> f64 {
        self.dfregs[(index & 0b1_1111) as usize]
    }

    pub fn set_dfreg(&mut self, index: u8, value: f64) {
        self.dfregs[(index & 0b1_1111) as usize] = value;
    }

    pub fn csr(&self, addr: u16) -> u32 {
        self.csr_space.read(addr)
    }

    pub fn set_csr(&mut self, addr: u16, value: u32) {
        self.csr_space.write(addr, value);
    }

    pub fn pc(&self) -> Uxlen {
        self.reg_pc
    }

    pub fn set_pc(&mut self, pc: Uxlen) {
        self.reg_pc = pc;
    }

    pub fn privilege(&self) -> PrivilegeLevel {
        self.privilege
    }

    pub fn set_privilege(&mut self, privilege: PrivilegeLevel) {
        self.privilege = privilege;
    }

    /// Address of a pending LR reservation.
    pub fn reservation(&self) -> Option<Uxlen> {
        self.reservation
    }

    /// The trap vector as a machine word.
    fn mtvec(&self) -> Uxlen {
        self.csr_space.read(csr::MTVEC) as Uxlen
    }
}

impl Default for Hart {
    fn default() -> Self {
        Hart::new()
    }
}

/// Sign extends a 32 bit value to the register width.
fn sign_extend_word(value: u32) -> Uxlen {
    value as i32 as crate::Ixlen as Uxlen
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::platform::Memory;

    #[test]
    fn reset_state() {
        let hart = Hart::new();
        assert_eq!(hart.pc(), 0);
        assert_eq!(hart.privilege(), PrivilegeLevel::Machine);
        assert_eq!(hart.reservation(), None);
        assert!((0..32).all(|i| hart.reg(i) == 0));
    }

    #[test]
    fn x0_stays_zero() {
        let mut hart = Hart::new();
        hart.set_reg(0, 0xdead);
        assert_eq!(hart.reg(0), 0);
        hart.set_reg(5, 0xdead);
        assert_eq!(hart.reg(5), 0xdead);
    }

    #[test]
    fn hint_does_not_write_x0() {
        let mut hart = Hart::new();
        let mut memory = Memory::with_capacity(64);
        // addi x0, x0, 5
        hart.execute_instruction(&mut memory, 0x0050_0013);
        assert_eq!(hart.reg(0), 0);
        assert_eq!(hart.pc(), 4);
    }

    #[test]
    fn unknown_instruction_only_advances_pc() {
        let mut hart = Hart::new();
        let mut memory = Memory::with_capacity(64);
        hart.execute_instruction(&mut memory, 0xffff_ffff);
        assert_eq!(hart.pc(), 4);
        assert!((0..32).all(|i| hart.reg(i) == 0));
        // Reserved compressed encoding
        hart.execute_instruction(&mut memory, 0x0000);
        assert_eq!(hart.pc(), 6);
    }

    /// Keeps warnings so tests can inspect them.
    struct WarningLog;

    static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());
    static WARNING_LOG: WarningLog = WarningLog;

    impl log::Log for WarningLog {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                WARNINGS.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    #[test]
    fn reserved_compressed_warning_names_the_halfword() {
        log::set_logger(&WARNING_LOG).unwrap();
        log::set_max_level(log::LevelFilter::Warn);

        let mut hart = Hart::new();
        let mut memory = Memory::with_capacity(64);
        hart.set_pc(0x10);
        // c.jr with rs1 = x0
        hart.execute_instruction(&mut memory, 0x8002);
        assert_eq!(hart.pc(), 0x12);

        let warnings = WARNINGS.lock().unwrap();
        assert!(
            warnings.iter().any(|w| w.contains("0x8002") && w.contains("0x10")),
            "{warnings:?}"
        );
        assert!(!warnings.iter().any(|w| w.contains("0x00000000")), "{warnings:?}");
    }

    #[test]
    fn register_indices_wrap() {
        let mut hart = Hart::new();
        let mut memory = Memory::with_capacity(64);
        hart.set_reg(1, 40);
        hart.set_reg(2, 2);
        let mut instr = decode::decode(0x0020_81b3);
        assert_eq!(instr.kind, decode::InstKind::Add);
        // add x3, x1, x2 with every index offset by 32
        instr.rd += 32;
        instr.rs1 += 32;
        instr.rs2 += 32;
        hart.execute(&mut memory, &instr, 0x0020_81b3, 4);
        assert_eq!(hart.reg(3), 42);
        assert_eq!(hart.pc(), 4);
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend_word(0xffff_fff0) as crate::Ixlen, -16);
        assert_eq!(sign_extend_word(5), 5);
    }
}
