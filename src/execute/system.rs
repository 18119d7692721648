//! Fences, traps, trap returns and Zicsr.

use super::{Hart, Next};
use crate::decode::{DecodedInstruction, InstKind};
use crate::platform::exception::TrapCause;
use crate::platform::{csr, status, PrivilegeLevel};
use crate::Uxlen;

/// How a CSR instruction combines the old value with its source.
#[derive(Debug, Clone, Copy)]
enum CsrOp {
    Write,
    Set,
    Clear,
}

impl Hart {
    pub(super) fn execute_system(&mut self, instr: &DecodedInstruction) -> Next {
        // The CSR Address space needs the zero extended immediate
        let addr = instr.imm as u16 & 0xfff;
        // The immediate variants use the 5 bits that usually encode rs1
        let reg = self.regs[instr.rs1 as usize] as u32;
        let zimm = instr.rs1 as u32;

        match instr.kind {
            // Single hart without caches or address translation
            InstKind::Fence | InstKind::FenceI | InstKind::SfenceVma | InstKind::Wfi => {
                Next::Step
            }
            InstKind::Ecall => self.execute_ecall(),
            InstKind::Ebreak => self.trap_to_machine(TrapCause::Breakpoint),
            // User mode traps are not implemented
            InstKind::Uret => self.trap_to_machine(TrapCause::IllegalInstruction),
            InstKind::Mret => self.execute_mret(),
            InstKind::Sret => self.execute_sret(),
            InstKind::Csrrw => self.execute_csr(CsrOp::Write, addr, reg, instr.rd),
            InstKind::Csrrs => self.execute_csr(CsrOp::Set, addr, reg, instr.rd),
            InstKind::Csrrc => self.execute_csr(CsrOp::Clear, addr, reg, instr.rd),
            InstKind::Csrrwi => self.execute_csr(CsrOp::Write, addr, zimm, instr.rd),
            InstKind::Csrrsi => self.execute_csr(CsrOp::Set, addr, zimm, instr.rd),
            InstKind::Csrrci => self.execute_csr(CsrOp::Clear, addr, zimm, instr.rd),
            kind => unreachable!("{kind:?} is not a system instruction"),
        }
    }

    /// Environment calls from S mode are recorded in the supervisor
    /// registers, all others in the machine registers. The handler always
    /// runs in machine mode.
    fn execute_ecall(&mut self) -> Next {
        let cause = TrapCause::environment_call(self.privilege);
        if self.privilege == PrivilegeLevel::Supervisor {
            self.trap_to_supervisor(cause)
        } else {
            self.trap_to_machine(cause)
        }
    }

    fn trap_to_machine(&mut self, cause: TrapCause) -> Next {
        log::trace!("Trap {cause:?} at {:#x} from {:?}", self.reg_pc, self.privilege);
        self.csr_space.write(csr::MEPC, self.reg_pc as u32);
        self.csr_space.write(csr::MCAUSE, cause.into());

        // MPP = previous privilege, MPIE = MIE, MIE = 0
        let mstatus = self.csr_space.read(csr::MSTATUS);
        let mpp = u8::from(self.privilege) as u32;
        let mpie = if mstatus & status::MIE != 0 { status::MPIE } else { 0 };
        let mstatus = (mstatus & !(status::MPP | status::MPIE | status::MIE))
            | mpp << status::MPP_SHIFT
            | mpie;
        self.csr_space.write(csr::MSTATUS, mstatus);

        self.privilege = PrivilegeLevel::Machine;
        Next::Jump(self.mtvec())
    }

    fn trap_to_supervisor(&mut self, cause: TrapCause) -> Next {
        log::trace!("Trap {cause:?} at {:#x} from {:?}", self.reg_pc, self.privilege);
        self.csr_space.write(csr::SEPC, self.reg_pc as u32);
        self.csr_space.write(csr::SCAUSE, cause.into());

        // SPP = previous privilege, SPIE = SIE, SIE = 0
        let sstatus = self.csr_space.read(csr::SSTATUS);
        let spp = if self.privilege == PrivilegeLevel::User { 0 } else { status::SPP };
        let spie = if sstatus & status::SIE != 0 { status::SPIE } else { 0 };
        let sstatus = (sstatus & !(status::SPP | status::SPIE | status::SIE)) | spp | spie;
        self.csr_space.write(csr::SSTATUS, sstatus);

        self.privilege = PrivilegeLevel::Machine;
        Next::Jump(self.mtvec())
    }

    fn execute_mret(&mut self) -> Next {
        let mstatus = self.csr_space.read(csr::MSTATUS);
        let mpp = ((mstatus & status::MPP) >> status::MPP_SHIFT) as u8;
        self.privilege = PrivilegeLevel::try_from(mpp).unwrap_or_else(|_| {
            log::warn!("Reserved privilege {mpp} in mstatus.MPP, returning to user mode");
            PrivilegeLevel::User
        });

        // MIE = MPIE, MPIE = 1, MPP = U
        let mie = if mstatus & status::MPIE != 0 { status::MIE } else { 0 };
        let mstatus = (mstatus & !(status::MIE | status::MPP)) | mie | status::MPIE;
        self.csr_space.write(csr::MSTATUS, mstatus);

        Next::Jump(self.csr_space.read(csr::MEPC) as Uxlen)
    }

    fn execute_sret(&mut self) -> Next {
        let sstatus = self.csr_space.read(csr::SSTATUS);
        self.privilege = if sstatus & status::SPP != 0 {
            PrivilegeLevel::Supervisor
        } else {
            PrivilegeLevel::User
        };

        // SIE = SPIE, SPIE = 1, SPP = U
        let sie = if sstatus & status::SPIE != 0 { status::SIE } else { 0 };
        let sstatus = (sstatus & !(status::SIE | status::SPP)) | sie | status::SPIE;
        self.csr_space.write(csr::SSTATUS, sstatus);

        Next::Jump(self.csr_space.read(csr::SEPC) as Uxlen)
    }

    // Zicsr: Control Status Register support.
    /// The old value goes to `rd`, zero extended. The CSR is modified even
    /// when `rd` is x0 or the source is zero.
    fn execute_csr(&mut self, op: CsrOp, addr: u16, src: u32, dest: u8) -> Next {
        let prev = self.csr_space.read(addr);
        let value = match op {
            CsrOp::Write => src,
            CsrOp::Set => prev | src,
            CsrOp::Clear => prev & !src,
        };
        self.csr_space.write(addr, value);
        self.write_reg(dest, prev as Uxlen);
        Next::Step
    }
}
