//! "F" and "D" extensions (Chapters 11 and 12).
//!
//! Arithmetic uses the host's IEEE 754 operations, which round to nearest
//! even. Only the conversions to integers honor the rounding mode.
//! Exception flags are not tracked.

use std::num::FpCategory;

use num_enum::TryFromPrimitive;

use super::{sign_extend_word, Hart, Next};
use crate::decode::{DecodedInstruction, InstKind};
use crate::platform::csr;
use crate::Uxlen;

/// Rounding mode field of an instruction or of `frm`, Table 11.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
enum RoundingMode {
    /// Round to nearest, ties to even
    Rne = 0b000,
    /// Round towards zero
    Rtz = 0b001,
    /// Round down
    Rdn = 0b010,
    /// Round up
    Rup = 0b011,
    /// Round to nearest, ties to max magnitude
    Rmm = 0b100,
    /// Use `frm`
    Dyn = 0b111,
}

/// Bit level access shared by both precisions.
trait Ieee754: Copy + PartialOrd {
    const SIGN: u64;
    const CANONICAL_NAN: u64;

    fn to_raw(self) -> u64;
    fn from_raw(bits: u64) -> Self;
    fn category(self) -> FpCategory;

    fn is_negative(self) -> bool {
        self.to_raw() & Self::SIGN != 0
    }

    fn is_nan(self) -> bool {
        self.category() == FpCategory::Nan
    }
}

impl Ieee754 for f32 {
    const SIGN: u64 = 1 << 31;
    const CANONICAL_NAN: u64 = 0x7fc0_0000;

    fn to_raw(self) -> u64 {
        self.to_bits() as u64
    }

    fn from_raw(bits: u64) -> f32 {
        f32::from_bits(bits as u32)
    }

    fn category(self) -> FpCategory {
        self.classify()
    }
}

impl Ieee754 for f64 {
    const SIGN: u64 = 1 << 63;
    const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

    fn to_raw(self) -> u64 {
        self.to_bits()
    }

    fn from_raw(bits: u64) -> f64 {
        f64::from_bits(bits)
    }

    fn category(self) -> FpCategory {
        self.classify()
    }
}

/// Sign source of FSGNJ, FSGNJN and FSGNJX.
#[derive(Debug, Clone, Copy)]
enum SignInjection {
    Copy,
    Negate,
    Xor,
}

fn sign_inject<F: Ieee754>(a: F, b: F, injection: SignInjection) -> F {
    let sign = match injection {
        SignInjection::Copy => b.to_raw(),
        SignInjection::Negate => !b.to_raw(),
        SignInjection::Xor => a.to_raw() ^ b.to_raw(),
    };
    F::from_raw(a.to_raw() & !F::SIGN | sign & F::SIGN)
}

/// IEEE 754-2008 minNum: a single NaN operand is ignored, -0 < +0.
fn fmin<F: Ieee754>(a: F, b: F) -> F {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => F::from_raw(F::CANONICAL_NAN),
        (true, false) => b,
        (false, true) => a,
        (false, false) => {
            if a < b || (a == b && a.is_negative()) {
                a
            } else {
                b
            }
        }
    }
}

/// IEEE 754-2008 maxNum: a single NaN operand is ignored, +0 > -0.
fn fmax<F: Ieee754>(a: F, b: F) -> F {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => F::from_raw(F::CANONICAL_NAN),
        (true, false) => b,
        (false, true) => a,
        (false, false) => {
            if a > b || (a == b && !a.is_negative()) {
                a
            } else {
                b
            }
        }
    }
}

/// One hot classification mask, Table 11.5. NaNs are told apart by their
/// sign bit: bit 8 if it is set, bit 9 otherwise.
fn fclass<F: Ieee754>(value: F) -> Uxlen {
    let bit = match (value.category(), value.is_negative()) {
        (FpCategory::Infinite, true) => 0,
        (FpCategory::Normal, true) => 1,
        (FpCategory::Subnormal, true) => 2,
        (FpCategory::Zero, true) => 3,
        (FpCategory::Zero, false) => 4,
        (FpCategory::Subnormal, false) => 5,
        (FpCategory::Normal, false) => 6,
        (FpCategory::Infinite, false) => 7,
        (FpCategory::Nan, true) => 8,
        (FpCategory::Nan, false) => 9,
    };
    1 << bit
}

fn round(value: f64, mode: RoundingMode) -> f64 {
    match mode {
        RoundingMode::Rtz => value.trunc(),
        RoundingMode::Rdn => value.floor(),
        RoundingMode::Rup => value.ceil(),
        RoundingMode::Rmm => value.round(),
        RoundingMode::Rne | RoundingMode::Dyn => {
            if (value - value.trunc()).abs() == 0.5 {
                2.0 * (value / 2.0).round()
            } else {
                value.round()
            }
        }
    }
}

// Float to integer conversions saturate, NaN converts to the largest value.
// `as` casts from floats already saturate.

fn fcvt_w(value: f64, mode: RoundingMode) -> Uxlen {
    let result = if value.is_nan() { i32::MAX } else { round(value, mode) as i32 };
    sign_extend_word(result as u32)
}

/// The 32 bit result is sign extended like all word results.
fn fcvt_wu(value: f64, mode: RoundingMode) -> Uxlen {
    let result = if value.is_nan() { u32::MAX } else { round(value, mode) as u32 };
    sign_extend_word(result)
}

fn fcvt_l(value: f64, mode: RoundingMode) -> Uxlen {
    let result = if value.is_nan() { i64::MAX } else { round(value, mode) as i64 };
    result as Uxlen
}

fn fcvt_lu(value: f64, mode: RoundingMode) -> Uxlen {
    let result = if value.is_nan() { u64::MAX } else { round(value, mode) as u64 };
    result as Uxlen
}

impl Hart {
    /// Rounding mode of an instruction, resolving DYN through `frm`.
    fn rounding_mode(&self, raw_word: u32) -> RoundingMode {
        let mut rm = ((raw_word >> 12) & 0b111) as u8;
        if rm == RoundingMode::Dyn as u8 {
            rm = (self.csr_space.read(csr::FRM) & 0b111) as u8;
        }
        match RoundingMode::try_from(rm) {
            Ok(RoundingMode::Dyn) | Err(_) => {
                log::warn!("Invalid rounding mode {rm:#05b}, rounding to nearest even");
                RoundingMode::Rne
            }
            Ok(mode) => mode,
        }
    }

    pub(super) fn execute_float_single(&mut self, instr: &DecodedInstruction, raw_word: u32) -> Next {
        use InstKind::*;

        let rd = instr.rd as usize;
        let a = self.fregs[instr.rs1 as usize];
        let b = self.fregs[instr.rs2 as usize];
        let c = self.fregs[(raw_word >> 27) as usize];
        let src = self.regs[instr.rs1 as usize];

        match instr.kind {
            FmaddS => self.fregs[rd] = a.mul_add(b, c),
            FmsubS => self.fregs[rd] = a.mul_add(b, -c),
            FnmsubS => self.fregs[rd] = (-a).mul_add(b, c),
            FnmaddS => self.fregs[rd] = (-a).mul_add(b, -c),
            FaddS => self.fregs[rd] = a + b,
            FsubS => self.fregs[rd] = a - b,
            FmulS => self.fregs[rd] = a * b,
            FdivS => self.fregs[rd] = a / b,
            FsqrtS => self.fregs[rd] = a.sqrt(),
            FsgnjS => self.fregs[rd] = sign_inject(a, b, SignInjection::Copy),
            FsgnjnS => self.fregs[rd] = sign_inject(a, b, SignInjection::Negate),
            FsgnjxS => self.fregs[rd] = sign_inject(a, b, SignInjection::Xor),
            FminS => self.fregs[rd] = fmin(a, b),
            FmaxS => self.fregs[rd] = fmax(a, b),
            FeqS => self.write_reg(instr.rd, (a == b) as Uxlen),
            FltS => self.write_reg(instr.rd, (a < b) as Uxlen),
            FleS => self.write_reg(instr.rd, (a <= b) as Uxlen),
            FclassS => self.write_reg(instr.rd, fclass(a)),
            FcvtWS => self.write_reg(instr.rd, fcvt_w(a as f64, self.rounding_mode(raw_word))),
            FcvtWuS => self.write_reg(instr.rd, fcvt_wu(a as f64, self.rounding_mode(raw_word))),
            FcvtLS => self.write_reg(instr.rd, fcvt_l(a as f64, self.rounding_mode(raw_word))),
            FcvtLuS => self.write_reg(instr.rd, fcvt_lu(a as f64, self.rounding_mode(raw_word))),
            FcvtSW => self.fregs[rd] = src as i32 as f32,
            FcvtSWu => self.fregs[rd] = src as u32 as f32,
            FcvtSL => self.fregs[rd] = src as i64 as f32,
            FcvtSLu => self.fregs[rd] = src as u64 as f32,
            FmvXW => self.write_reg(instr.rd, sign_extend_word(a.to_bits())),
            FmvWX => self.fregs[rd] = f32::from_bits(src as u32),
            kind => unreachable!("{kind:?} is not a single precision operation"),
        }
        Next::Step
    }

    pub(super) fn execute_float_double(&mut self, instr: &DecodedInstruction, raw_word: u32) -> Next {
        use InstKind::*;

        let rd = instr.rd as usize;
        let a = self.dfregs[instr.rs1 as usize];
        let b = self.dfregs[instr.rs2 as usize];
        let c = self.dfregs[(raw_word >> 27) as usize];
        let src = self.regs[instr.rs1 as usize];

        match instr.kind {
            FmaddD => self.dfregs[rd] = a.mul_add(b, c),
            FmsubD => self.dfregs[rd] = a.mul_add(b, -c),
            FnmsubD => self.dfregs[rd] = (-a).mul_add(b, c),
            FnmaddD => self.dfregs[rd] = (-a).mul_add(b, -c),
            FaddD => self.dfregs[rd] = a + b,
            FsubD => self.dfregs[rd] = a - b,
            FmulD => self.dfregs[rd] = a * b,
            FdivD => self.dfregs[rd] = a / b,
            FsqrtD => self.dfregs[rd] = a.sqrt(),
            FsgnjD => self.dfregs[rd] = sign_inject(a, b, SignInjection::Copy),
            FsgnjnD => self.dfregs[rd] = sign_inject(a, b, SignInjection::Negate),
            FsgnjxD => self.dfregs[rd] = sign_inject(a, b, SignInjection::Xor),
            FminD => self.dfregs[rd] = fmin(a, b),
            FmaxD => self.dfregs[rd] = fmax(a, b),
            FeqD => self.write_reg(instr.rd, (a == b) as Uxlen),
            FltD => self.write_reg(instr.rd, (a < b) as Uxlen),
            FleD => self.write_reg(instr.rd, (a <= b) as Uxlen),
            FclassD => self.write_reg(instr.rd, fclass(a)),
            // Moves between the banks
            FcvtSD => self.fregs[rd] = a as f32,
            FcvtDS => self.dfregs[rd] = self.fregs[instr.rs1 as usize] as f64,
            FcvtWD => self.write_reg(instr.rd, fcvt_w(a, self.rounding_mode(raw_word))),
            FcvtWuD => self.write_reg(instr.rd, fcvt_wu(a, self.rounding_mode(raw_word))),
            FcvtLD => self.write_reg(instr.rd, fcvt_l(a, self.rounding_mode(raw_word))),
            FcvtLuD => self.write_reg(instr.rd, fcvt_lu(a, self.rounding_mode(raw_word))),
            FcvtDW => self.dfregs[rd] = src as i32 as f64,
            FcvtDWu => self.dfregs[rd] = src as u32 as f64,
            FcvtDL => self.dfregs[rd] = src as i64 as f64,
            FcvtDLu => self.dfregs[rd] = src as u64 as f64,
            FmvXD => self.write_reg(instr.rd, a.to_bits() as Uxlen),
            FmvDX => self.dfregs[rd] = f64::from_bits(src as u64),
            kind => unreachable!("{kind:?} is not a double precision operation"),
        }
        Next::Step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(fclass(f32::NEG_INFINITY), 1 << 0);
        assert_eq!(fclass(-1.0f32), 1 << 1);
        assert_eq!(fclass(-f32::MIN_POSITIVE / 2.0), 1 << 2);
        assert_eq!(fclass(-0.0f64), 1 << 3);
        assert_eq!(fclass(0.0f64), 1 << 4);
        assert_eq!(fclass(f64::MIN_POSITIVE / 2.0), 1 << 5);
        assert_eq!(fclass(1.0f64), 1 << 6);
        assert_eq!(fclass(f64::INFINITY), 1 << 7);
        assert_eq!(fclass(f32::from_bits(0xffc0_0000)), 1 << 8);
        assert_eq!(fclass(f32::from_bits(0x7fc0_0000)), 1 << 9);
        // Signaling NaN with clear sign bit
        assert_eq!(fclass(f32::from_bits(0x7f80_0001)), 1 << 9);
    }

    #[test]
    fn min_max_nan_and_zero() {
        assert_eq!(fmin(f32::NAN, 2.0), 2.0);
        assert_eq!(fmax(3.0, f32::NAN), 3.0);
        assert_eq!(fmin(f64::NAN, f64::NAN).to_bits(), 0x7ff8_0000_0000_0000);
        assert_eq!(fmax(f32::NAN, f32::NAN).to_bits(), 0x7fc0_0000);
        assert_eq!(fmin(0.0f32, -0.0).to_bits(), 0x8000_0000);
        assert_eq!(fmax(-0.0f64, 0.0).to_bits(), 0);
        assert_eq!(fmin(1.0f64, -2.0), -2.0);
    }

    #[test]
    fn sign_injection() {
        assert_eq!(sign_inject(1.5f32, -0.0, SignInjection::Copy), -1.5);
        assert_eq!(sign_inject(1.5f64, -0.0, SignInjection::Negate), 1.5);
        assert_eq!(sign_inject(-1.5f32, -2.0, SignInjection::Xor), 1.5);
    }

    #[test]
    fn rounding_modes() {
        assert_eq!(round(2.5, RoundingMode::Rne), 2.0);
        assert_eq!(round(3.5, RoundingMode::Rne), 4.0);
        assert_eq!(round(-2.5, RoundingMode::Rne), -2.0);
        assert_eq!(round(2.5, RoundingMode::Rmm), 3.0);
        assert_eq!(round(-2.7, RoundingMode::Rtz), -2.0);
        assert_eq!(round(-2.2, RoundingMode::Rdn), -3.0);
        assert_eq!(round(2.2, RoundingMode::Rup), 3.0);
    }

    #[test]
    fn saturating_conversions() {
        assert_eq!(fcvt_w(f64::NAN, RoundingMode::Rtz), sign_extend_word(i32::MAX as u32));
        assert_eq!(fcvt_w(-1e20, RoundingMode::Rtz), sign_extend_word(i32::MIN as u32));
        assert_eq!(fcvt_w(-3.7, RoundingMode::Rtz), sign_extend_word(-3i32 as u32));
        assert_eq!(fcvt_wu(-1.0, RoundingMode::Rtz), 0);
        assert_eq!(fcvt_wu(1e20, RoundingMode::Rtz), sign_extend_word(u32::MAX));
        assert_eq!(fcvt_lu(f64::NAN, RoundingMode::Rne), u64::MAX as Uxlen);
    }
}
