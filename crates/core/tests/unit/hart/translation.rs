//! Virtual memory tests through the executing hart.
//!
//! The translation mode lives in the status register's VM field; these
//! tests flip it directly and then run programs whose fetches and data
//! accesses must both translate.

use pretty_assertions::assert_eq;

use crate::common::{TestContext, ld, lw};

const START: u64 = 0x200;

/// Single base-and-bound region at the given base.
fn enable_bounds(ctx: &mut TestContext, base: u64, bound: u64) {
    let csrs = ctx.hart.csrs_mut();
    csrs.status |= 1 << 17; // VM = Mbb
    csrs.mbase = base;
    csrs.mbound = bound;
}

#[test]
fn bounds_mode_offsets_data_and_fetch() {
    let mut ctx = TestContext::new();
    enable_bounds(&mut ctx, 0x1000, 0x10000);

    // The program lives at physical base + START; data at physical 0x1050.
    ctx.write_program(0x1000 + START, &[lw(1, 0, 0x50)]);
    ctx.store(0x1050, 4, 0x1234_5678);
    ctx.hart.set_pc(START);

    ctx.run(1);
    assert_eq!(ctx.hart.x(1), 0x1234_5678);
}

#[test]
fn bounds_violation_faults_with_virtual_address() {
    let mut ctx = TestContext::new();
    enable_bounds(&mut ctx, 0x1000, 0x300);

    ctx.write_program(0x1000 + START, &[ld(1, 2, 0)]);
    ctx.hart.set_pc(START);
    ctx.hart.set_x(2, 0x2000);

    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().mcause, 5);
    assert_eq!(ctx.hart.csrs().mbadaddr, 0x2000);
    assert_eq!(ctx.hart.csrs().mepc, START);
}

#[test]
fn paged_mode_walks_tables_for_data_access() {
    let mut ctx = TestContext::new();
    {
        let csrs = ctx.hart.csrs_mut();
        csrs.status |= 9 << 17; // VM = three-level paging
        csrs.sptbr = 0x4000;
    }

    // Three-level descent with separate identity leaves: the program page
    // is executable (type 7), the data page user-readable (type 3). The
    // fetch's referenced-bit write-back must not disturb the data leaf.
    ctx.store(0x4000, 8, (0x5 << 10) | 1); // root -> table 0x5000
    ctx.store(0x5000, 8, (0x6 << 10) | 1); // -> leaf table 0x6000
    ctx.store(0x6000, 8, (7 << 1) | 1); // page 0: code
    ctx.store(0x6008, 8, (1 << 10) | (3 << 1) | 1); // page 1: data

    // 0x1000 does not fit an I-type immediate; supply it via a register.
    ctx.write_program(START, &[ld(1, 2, 0)]);
    ctx.hart.set_x(2, 0x1000);
    ctx.store(0x1000, 8, 99);

    ctx.run(1);
    assert_eq!(ctx.hart.x(1), 99);

    // Both leaves carry the referenced bit afterwards.
    assert_ne!(ctx.load(0x6000, 8) & (1 << 5), 0);
    assert_ne!(ctx.load(0x6008, 8) & (1 << 5), 0);
}
