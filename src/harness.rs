//! Text harness feeding hexadecimal instruction words to a hart.
//!
//! A program is a text file with one instruction word per line, optionally
//! prefixed with `0x`. `#` starts a comment, blank lines are ignored:
//!
//! ```text
//! # set up x1
//! 0x00500093   # addi x1, x0, 5
//! 00108113     # addi x2, x1, 1
//! ```

use std::fs;
use std::io::{self, Write};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use crate::decode::{self, Family};
use crate::platform::AddressSpace;
use crate::{compressed, Hart, Ixlen, Uxlen};

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: `{text}` is not a hexadecimal instruction word")]
    InvalidWord {
        line: usize,
        text: String,
        #[source]
        source: ParseIntError,
    },
    #[error("cannot write report: {0}")]
    Output(#[from] io::Error),
}

/// One instruction of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLine {
    /// 1 based line number in the source text
    pub line: usize,
    pub word: u32,
    /// Text after `#`, trimmed
    pub comment: Option<String>,
}

/// Parses a single line. Blank and comment-only lines yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<ProgramLine>, HarnessError> {
    let (code, comment) = match text.split_once('#') {
        Some((code, comment)) => (code, Some(comment.trim().to_owned())),
        None => (text, None),
    };

    let Some(token) = code.split_whitespace().next() else {
        return Ok(None);
    };
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);

    let word = u32::from_str_radix(digits, 16).map_err(|source| HarnessError::InvalidWord {
        line,
        text: token.to_owned(),
        source,
    })?;

    Ok(Some(ProgramLine {
        line,
        word,
        comment: comment.filter(|comment| !comment.is_empty()),
    }))
}

/// Parses a whole program. Lines that are not valid words are logged and
/// skipped.
pub fn parse_program(source: &str) -> Vec<ProgramLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, text)| match parse_line(index + 1, text) {
            Ok(line) => line,
            Err(err) => {
                log::warn!("Skipping {err}");
                None
            }
        })
        .collect()
}

pub fn load_program(path: &Path) -> Result<Vec<ProgramLine>, HarnessError> {
    let source = fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse_program(&source))
}

const SEPARATOR: &str = "--------------------------------";

/// Executes `program` in order, writing a report after every instruction:
/// the stored memory word for stores, else the destination register, then
/// PC and privilege level.
pub fn run<A: AddressSpace + ?Sized, W: Write>(
    hart: &mut Hart,
    memory: &mut A,
    program: &[ProgramLine],
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "=== RISC-V Emulator Test ===")?;
    writeln!(out)?;

    for (test, line) in program.iter().enumerate() {
        match &line.comment {
            Some(comment) => writeln!(out, "Test {}: {:#010x} # {comment}", test + 1, line.word)?,
            None => writeln!(out, "Test {}: {:#010x}", test + 1, line.word)?,
        }

        hart.execute_instruction(memory, line.word);
        report(hart, memory, line.word, out)?;
    }
    Ok(())
}

fn report<A: AddressSpace + ?Sized, W: Write>(
    hart: &Hart,
    memory: &A,
    raw_word: u32,
    out: &mut W,
) -> io::Result<()> {
    let word = if raw_word & 0b11 != 0b11 {
        compressed::expand(raw_word as u16)
    } else {
        raw_word
    };
    let instr = decode::decode(word);

    writeln!(out, "{SEPARATOR}")?;
    if instr.kind.family() == Family::Store {
        // Stores do not modify registers, rs1 still holds the base
        let addr = hart.reg(instr.rs1).wrapping_add(instr.imm as Ixlen as Uxlen);
        writeln!(out, "Memory at {addr:#010x}: {}", memory.read_word(addr))?;
    } else if instr.rd != 0 {
        let value = hart.reg(instr.rd);
        writeln!(out, "Result: x{} = {value} ({value:#x})", instr.rd)?;
    } else {
        writeln!(out, "Result: No register change")?;
    }
    writeln!(out, "PC: {:#010x}", hart.pc())?;
    writeln!(out, "Privilege Level: {}", u8::from(hart.privilege()))?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out)
}

/// Writes PC, privilege and all non-zero integer registers.
pub fn dump_registers<W: Write>(hart: &Hart, out: &mut W) -> io::Result<()> {
    writeln!(out, "PC: {:#010x}", hart.pc())?;
    writeln!(out, "Privilege Level: {}", u8::from(hart.privilege()))?;
    for index in 1..32 {
        let value = hart.reg(index);
        if value != 0 {
            writeln!(out, "x{index} = {value} ({value:#x})")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Memory;

    #[test]
    fn parse_words_and_comments() {
        let program = parse_program(
            "# header\n\
             \n\
             0x00500093 # addi x1, x0, 5\n\
             00108113\n\
             \t0X0000_0013\n\
             zzzz # not hex\n",
        );

        assert_eq!(
            program,
            vec![
                ProgramLine {
                    line: 3,
                    word: 0x0050_0093,
                    comment: Some("addi x1, x0, 5".to_owned()),
                },
                ProgramLine {
                    line: 4,
                    word: 0x0010_8113,
                    comment: None,
                },
            ]
        );
    }

    #[test]
    fn invalid_word_reports_line() {
        match parse_line(7, "0xfoo") {
            Err(HarnessError::InvalidWord { line, text, .. }) => {
                assert_eq!(line, 7);
                assert_eq!(text, "0xfoo");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_line(1, "   # only a comment").unwrap().is_none());
    }

    #[test]
    fn report_format() {
        let program = parse_program(
            "0x00500093 # addi x1, x0, 5\n\
             0x00102223 # sw x1, 4(x0)\n\
             0x00000013\n",
        );
        let mut hart = Hart::new();
        let mut memory = Memory::with_capacity(64);
        let mut out = Vec::new();
        run(&mut hart, &mut memory, &program, &mut out).unwrap();

        let report = String::from_utf8(out).unwrap();
        assert!(report.starts_with("=== RISC-V Emulator Test ===\n\n"));
        assert!(report.contains("Test 1: 0x00500093 # addi x1, x0, 5\n"));
        assert!(report.contains("Result: x1 = 5 (0x5)\n"));
        assert!(report.contains("Memory at 0x00000004: 5\n"));
        assert!(report.contains("Test 3: 0x00000013\n"));
        assert!(report.contains("Result: No register change\n"));
        assert!(report.contains("PC: 0x0000000c\n"));
        assert!(report.contains("Privilege Level: 3\n"));
    }
}
