//! "A" extension: reservations and read-modify-write operations.

#[macro_use]
mod common;

use common::*;
use rvhart::{AddressSpace, Uxlen};

hart_test!(lr_sc_pair, |hart, memory| {
    memory.write_word(0x100, 7);
    execute(
        &mut hart,
        &mut memory,
        &[
            addi(1, 0, 0x100),
            addi(2, 0, 42),
            amo_w(amo::LR, 3, 1, 0),
            amo_w(amo::SC, 4, 1, 2),
        ],
    );
    assert_eq!(hart.reg(3), 7);
    assert_eq!(hart.reg(4), 0);
    assert_eq!(memory.read_word(0x100), 42);
    assert_eq!(hart.reservation(), None);

    // The reservation was consumed
    execute(&mut hart, &mut memory, &[addi(2, 0, 99), amo_w(amo::SC, 5, 1, 2)]);
    assert_eq!(hart.reg(5), 1);
    assert_eq!(memory.read_word(0x100), 42);
});

hart_test!(sc_to_other_address_clears_reservation, |hart, memory| {
    execute(
        &mut hart,
        &mut memory,
        &[
            addi(1, 0, 0x100),
            addi(2, 0, 0x104),
            addi(3, 0, 5),
            amo_w(amo::LR, 4, 1, 0),
            amo_w(amo::SC, 5, 2, 3),
            amo_w(amo::SC, 6, 1, 3),
        ],
    );
    assert_eq!(hart.reg(5), 1);
    assert_eq!(hart.reg(6), 1);
    assert_eq!(memory.read_word(0x100), 0);
    assert_eq!(memory.read_word(0x104), 0);
});

hart_test!(lr_into_x0_still_reserves, |hart, memory| {
    execute(
        &mut hart,
        &mut memory,
        &[addi(1, 0, 0x80), amo_w(amo::LR, 0, 1, 0)],
    );
    assert_eq!(hart.reservation(), Some(0x80));

    execute(&mut hart, &mut memory, &[addi(2, 0, 3), amo_w(amo::SC, 3, 1, 2)]);
    assert_eq!(hart.reg(3), 0);
    assert_eq!(memory.read_word(0x80), 3);
});

hart_test!(amoadd_returns_old_value, |hart, memory| {
    memory.write_word(0x100, 10);
    execute(
        &mut hart,
        &mut memory,
        &[
            addi(1, 0, 0x100),
            addi(2, 0, 5),
            amo_w(amo::ADD, 3, 1, 2),
        ],
    );
    assert_eq!(memory.read_word(0x100), 15);
    assert_eq!(hart.reg(3), 10);
});

hart_test!(amo_logic_and_swap, |hart, memory| {
    memory.write_word(0x10, 0b1100);
    execute(
        &mut hart,
        &mut memory,
        &[
            addi(1, 0, 0x10),
            addi(2, 0, 0b1010),
            amo_w(amo::AND, 3, 1, 2),
            amo_w(amo::OR, 4, 1, 2),
            amo_w(amo::XOR, 5, 1, 2),
            amo_w(amo::SWAP, 6, 1, 0),
        ],
    );
    assert_eq!(hart.reg(3), 0b1100);
    assert_eq!(hart.reg(4), 0b1000);
    assert_eq!(hart.reg(5), 0b1010);
    assert_eq!(hart.reg(6), 0);
    assert_eq!(memory.read_word(0x10), 0);
});

hart_test!(amo_min_max_signedness, |hart, memory| {
    execute(&mut hart, &mut memory, &[addi(1, 0, 0x100), addi(2, 0, 1)]);

    let cases = [
        (amo::MIN, 0xffff_ffff),
        (amo::MAX, 1),
        (amo::MINU, 1),
        (amo::MAXU, 0xffff_ffff),
    ];
    for (funct5, expected) in cases {
        memory.write_word(0x100, 0xffff_ffff);
        hart.execute_instruction(&mut memory, amo_w(funct5, 3, 1, 2));
        assert_eq!(memory.read_word(0x100), expected, "funct5 {funct5:#07b}");
        // The loaded word is sign extended
        assert_eq!(hart.reg(3), Uxlen::MAX);
    }
});
