//! The hart against a user supplied address space that only implements
//! byte accesses.

mod common;

use std::collections::HashMap;

use common::*;
use rvhart::{AddressSpace, Hart, Uxlen};

/// Sparse memory, untouched bytes read as 0xaa.
#[derive(Default)]
struct Sparse {
    bytes: HashMap<Uxlen, u8>,
}

impl AddressSpace for Sparse {
    fn read_byte(&self, addr: Uxlen) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(0xaa)
    }

    fn write_byte(&mut self, addr: Uxlen, val: u8) {
        self.bytes.insert(addr, val);
    }
}

#[test]
fn wide_accesses_compose_bytes() {
    init_logger();
    let mut hart = Hart::new();
    let mut memory = Sparse::default();

    hart.set_reg(2, 0x1234_5678);
    execute(
        &mut hart,
        &mut memory,
        &[
            lui(1, 0x40),
            sw(2, 1, 0),
            lbu(3, 1, 1),
            lh(4, 1, 2),
            lbu(5, 1, 4),
        ],
    );

    assert_eq!(memory.bytes.len(), 4);
    assert_eq!(memory.read_byte(0x4_0000), 0x78);
    assert_eq!(memory.read_word(0x4_0000), 0x1234_5678);
    assert_eq!(hart.reg(3), 0x56);
    assert_eq!(hart.reg(4), 0x1234);
    assert_eq!(hart.reg(5), 0xaa);
}

#[test]
fn free_function_steps_through_trait_object() {
    init_logger();
    let mut hart = Hart::new();
    let mut sparse = Sparse::default();
    let memory: &mut dyn AddressSpace = &mut sparse;

    rvhart::execute_instruction(&mut hart, memory, addi(1, 0, 0x7f));
    rvhart::execute_instruction(&mut hart, memory, sb(1, 0, 8));
    assert_eq!(memory.read_byte(8), 0x7f);
    assert_eq!(hart.pc(), 8);
}
