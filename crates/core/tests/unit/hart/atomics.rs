//! Atomic instruction tests.

use pretty_assertions::assert_eq;

use crate::common::{TestContext, addi, amoadd_d, lr_d, lui, sc_d, sd};

const START: u64 = 0x200;

#[test]
fn reserved_pair_succeeds_without_interference() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[
            lui(1, 0x1000),
            addi(2, 0, 5),
            lr_d(3, 1),
            sc_d(4, 1, 2),
        ],
    );
    ctx.store(0x1000, 8, 42);
    ctx.run(4);
    assert_eq!(ctx.hart.x(3), 42);
    assert_eq!(ctx.hart.x(4), 0); // success
    assert_eq!(ctx.load(0x1000, 8), 5);
}

#[test]
fn conditional_fails_after_intervening_store() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[
            lui(1, 0x1000),
            addi(2, 0, 5),
            lr_d(3, 1),
            sd(1, 0, 0), // plain store to the sealed range
            sc_d(4, 1, 2),
        ],
    );
    ctx.store(0x1000, 8, 42);
    ctx.run(5);
    assert_eq!(ctx.hart.x(4), 1); // failure
    assert_eq!(ctx.load(0x1000, 8), 0);
}

#[test]
fn conditional_without_reservation_fails() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[lui(1, 0x1000), addi(2, 0, 5), sc_d(4, 1, 2)],
    );
    ctx.store(0x1000, 8, 42);
    ctx.run(3);
    assert_eq!(ctx.hart.x(4), 1);
    assert_eq!(ctx.load(0x1000, 8), 42);
}

#[test]
fn fetch_and_add_returns_old_value() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[lui(1, 0x1000), addi(2, 0, 8), amoadd_d(3, 1, 2)],
    );
    ctx.store(0x1000, 8, 34);
    ctx.run(3);
    assert_eq!(ctx.hart.x(3), 34);
    assert_eq!(ctx.load(0x1000, 8), 42);
}

#[test]
fn misaligned_atomic_faults() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[addi(1, 0, 0x104), addi(2, 0, 1), amoadd_d(3, 1, 2)],
    );
    ctx.run(2);
    let _ = ctx.step();
    // Store-misaligned cause, carrying the virtual address.
    assert_eq!(ctx.hart.csrs().mcause, 6);
    assert_eq!(ctx.hart.csrs().mbadaddr, 0x104);
}
