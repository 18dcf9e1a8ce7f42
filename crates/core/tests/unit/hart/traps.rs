//! Trap entry, delegation, and return tests.

use pretty_assertions::assert_eq;
use rvemu_core::{Privilege, StepResult};

use crate::common::{TestContext, addi, ecall, eret};

const START: u64 = 0x200;

#[test]
fn ecall_from_machine_saves_state_and_vectors() {
    let mut ctx = TestContext::new().load_program(START, &[ecall()]);
    let result = ctx.step();

    assert_eq!(
        result,
        StepResult::Trapped {
            cause: 11,
            target: Privilege::Machine
        }
    );
    // The saved pc points past the call; the vector is offset by the
    // originating privilege.
    assert_eq!(ctx.hart.csrs().mepc, START + 4);
    assert_eq!(ctx.hart.csrs().mcause, 11);
    assert_eq!(ctx.hart.pc(), 0x100 + 0x40 * 3);
}

#[test]
fn ecall_from_user_delegates_to_supervisor() {
    let mut ctx = TestContext::new().load_program(START, &[ecall()]);
    {
        let csrs = ctx.hart.csrs_mut();
        csrs.set_privilege(Privilege::User);
        csrs.mtdeleg = 1 << 8; // environment call from user mode
        csrs.stvec = 0x800;
    }
    let result = ctx.step();

    assert_eq!(
        result,
        StepResult::Trapped {
            cause: 8,
            target: Privilege::Supervisor
        }
    );
    assert_eq!(ctx.hart.csrs().scause, 8);
    assert_eq!(ctx.hart.csrs().sepc, START + 4);
    assert_eq!(ctx.hart.csrs().sbadaddr, 0);
    assert_eq!(ctx.hart.csrs().privilege(), Privilege::Supervisor);
    // Origin is user mode, so the vector takes no offset.
    assert_eq!(ctx.hart.pc(), 0x800);
    // Machine CSRs stay untouched.
    assert_eq!(ctx.hart.csrs().mcause, 0);
}

#[test]
fn delegation_without_supervisor_tier_collapses_to_machine() {
    let config = rvemu_core::Config {
        extensions: rvemu_core::Extensions::I.with(rvemu_core::Extensions::U),
        ..rvemu_core::Config::default()
    };
    let mut ctx = TestContext::with_config(config).load_program(START, &[ecall()]);
    {
        let csrs = ctx.hart.csrs_mut();
        csrs.set_privilege(Privilege::User);
        csrs.mtdeleg = 1 << 8;
        csrs.stvec = 0x800;
    }
    let result = ctx.step();

    // The delegation bit is set but no supervisor tier exists.
    assert_eq!(
        result,
        StepResult::Trapped {
            cause: 8,
            target: Privilege::Machine
        }
    );
    assert_eq!(ctx.hart.csrs().mcause, 8);
    assert_eq!(ctx.hart.csrs().scause, 0);
}

#[test]
fn undelegated_cause_lands_at_machine() {
    let mut ctx = TestContext::new().load_program(START, &[ecall()]);
    {
        let csrs = ctx.hart.csrs_mut();
        csrs.set_privilege(Privilege::User);
        csrs.mtdeleg = 0;
    }
    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().privilege(), Privilege::Machine);
    assert_eq!(ctx.hart.csrs().mcause, 8);
}

#[test]
fn trap_return_pops_the_privilege_stack() {
    let mut ctx = TestContext::new().load_program(START, &[ecall()]);
    ctx.hart.csrs_mut().set_privilege(Privilege::User);
    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().privilege(), Privilege::Machine);

    // The handler returns to the instruction after the call.
    ctx.write_program(ctx.hart.pc(), &[eret()]);
    ctx.run(1);
    assert_eq!(ctx.hart.pc(), START + 4);
    assert_eq!(ctx.hart.csrs().privilege(), Privilege::User);
}

#[test]
fn eret_in_user_mode_is_illegal() {
    let mut ctx = TestContext::new().load_program(START, &[eret()]);
    ctx.hart.csrs_mut().set_privilege(Privilege::User);
    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().mcause, 2);
}

#[test]
fn interrupt_sets_the_cause_top_bit() {
    let mut ctx = TestContext::new();
    let result = ctx.hart.interrupt(1).unwrap();
    let cause = (1 << 63) | 1;
    assert_eq!(
        result,
        StepResult::Trapped {
            cause,
            target: Privilege::Machine
        }
    );
    assert_eq!(ctx.hart.csrs().mcause, cause);
}

#[test]
fn unroutable_interrupt_is_fatal() {
    let mut ctx = TestContext::new();
    // Delegation bit index 4*code + origin + 16 overflows the register.
    let result = ctx.hart.interrupt(32);
    assert!(result.is_err());
    // CSR state is untouched.
    assert_eq!(ctx.hart.csrs().mcause, 0);
    assert_eq!(ctx.hart.csrs().privilege(), Privilege::Machine);
}

#[test]
fn breakpoint_saves_its_own_pc() {
    let mut ctx = TestContext::new().load_program(
        START,
        &[addi(1, 0, 1), crate::common::i_type(0x73, 0, 0, 0, 1)],
    );
    ctx.run(1);
    let _ = ctx.step();
    assert_eq!(ctx.hart.csrs().mcause, 3);
    assert_eq!(ctx.hart.csrs().mepc, START + 4);
}
