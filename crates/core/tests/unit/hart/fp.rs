//! Floating-point instructions end to end.

use pretty_assertions::assert_eq;
use rvemu_core::hart::csr::index;
use rvemu_core::{Config, Extensions};

use crate::common::{
    TestContext, addi, csrrs, fadd_d, fclass_d, fcvt_d_w, fcvt_w_d, feq_d, fld, fle_d, fsd, lui,
};

const START: u64 = 0x200;

#[test]
fn integer_round_trips_through_double() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[addi(1, 0, 12), fcvt_d_w(1, 1), fcvt_w_d(2, 1)],
    );
    ctx.run(3);
    assert_eq!(ctx.hart.f(1), 12.0f64.to_bits());
    assert_eq!(ctx.hart.x(2), 12);
}

#[test]
fn double_load_compute_store() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[
            lui(1, 0x1000),
            fld(1, 1, 0),
            fld(2, 1, 8),
            fadd_d(3, 1, 2),
            fsd(1, 3, 16),
        ],
    );
    ctx.store(0x1000, 8, 1.5f64.to_bits());
    ctx.store(0x1008, 8, 2.25f64.to_bits());
    ctx.run(5);
    assert_eq!(ctx.load(0x1010, 8), 3.75f64.to_bits());
}

#[test]
fn comparisons_write_the_integer_file() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[
            lui(1, 0x1000),
            fld(1, 1, 0),
            fld(2, 1, 8),
            fle_d(3, 1, 2),
            fle_d(4, 2, 1),
            feq_d(5, 1, 1),
        ],
    );
    ctx.store(0x1000, 8, 1.0f64.to_bits());
    ctx.store(0x1008, 8, 2.0f64.to_bits());
    ctx.run(6);
    assert_eq!(ctx.hart.x(3), 1);
    assert_eq!(ctx.hart.x(4), 0);
    assert_eq!(ctx.hart.x(5), 1);
}

#[test]
fn classification_of_negative_infinity() {
    let mut ctx = TestContext::new().load_program(START, &[fclass_d(1, 2)]);
    ctx.hart.set_f(2, f64::NEG_INFINITY.to_bits());
    ctx.run(1);
    assert_eq!(ctx.hart.x(1), 0);
}

#[test]
fn inexact_operations_accumulate_flags() {
    // 1.0 / 3.0 is inexact; the flags CSR picks it up.
    let mut ctx = TestContext::new().load_program(
        START,
        &[
            crate::common::r_type(0x53, 3, 0, 1, 2, 0x0D), // FDIV.D
            csrrs(4, index::FFLAGS, 0),
        ],
    );
    ctx.hart.set_f(1, 1.0f64.to_bits());
    ctx.hart.set_f(2, 3.0f64.to_bits());
    ctx.run(2);
    assert_eq!(ctx.hart.f(3), (1.0f64 / 3.0).to_bits());
    assert_eq!(ctx.hart.x(4) & 1, 1); // inexact
}

#[test]
fn single_precision_preserves_the_upper_slot_half() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[crate::common::r_type(0x53, 1, 0, 2, 0, 0x68)], // FCVT.S.W
    );
    ctx.hart.set_f(1, 0xAAAA_BBBB_0000_0000);
    ctx.hart.set_x(2, 2);
    ctx.run(1);
    let slot = ctx.hart.f(1);
    assert_eq!(slot >> 32, 0xAAAA_BBBB);
    assert_eq!(slot as u32, 2.0f32.to_bits());
}

#[test]
fn reserved_rounding_mode_faults() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[crate::common::r_type(0x53, 3, 5, 1, 2, 0x01)], // rm 5 is reserved
    );
    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().mcause, 2);
}

#[test]
fn float_opcodes_fault_without_the_extension() {
    let config = Config {
        extensions: Extensions::I.with(Extensions::U).with(Extensions::S),
        ..Config::default()
    };
    let mut ctx = TestContext::with_config(config).load_program(START, &[fadd_d(1, 2, 3)]);
    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().mcause, 2);
}

#[test]
fn dynamic_rounding_reads_the_mode_register() {
    // FDIV.D with rm=7 resolves through frm; round-up (3) lands one ulp
    // above the nearest result for this quotient.
    let mut ctx = TestContext::new().load_program(
        START,
        &[crate::common::r_type(0x53, 3, 7, 1, 2, 0x0D)],
    );
    ctx.hart.csrs_mut().frm = 3;
    ctx.hart.set_f(1, 1.0f64.to_bits());
    ctx.hart.set_f(2, 3.0f64.to_bits());
    ctx.run(1);
    let nearest = (1.0f64 / 3.0).to_bits();
    assert_eq!(ctx.hart.f(3), nearest + 1);
}
