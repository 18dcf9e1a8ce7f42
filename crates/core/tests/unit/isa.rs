//! Codec tests.
//!
//! Exhaustive-by-property checks that decode and encode are exact
//! inverses for every recognized opcode, plus targeted checks of the
//! split-immediate reassembly.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use rvemu_core::Exception;
use rvemu_core::isa::{decode, decode16, encode};

use crate::common::{addi, b_type, beq, jal, s_type};

/// Every opcode the decoder recognizes.
const OPCODES: &[u8] = &[
    0x03, 0x07, 0x0F, 0x13, 0x17, 0x1B, 0x23, 0x27, 0x2F, 0x33, 0x37, 0x3B, 0x43, 0x47, 0x4B,
    0x4F, 0x53, 0x63, 0x67, 0x6F, 0x73,
];

proptest! {
    /// Every bit of a recognized word survives a decode/encode round trip.
    #[test]
    fn decode_encode_round_trip(
        index in 0..OPCODES.len(),
        upper in 0u32..(1 << 25),
    ) {
        let word = (upper << 7) | u32::from(OPCODES[index]);
        let inst = decode(word).unwrap();
        prop_assert_eq!(encode(&inst), word);
    }

    /// I-type immediates sign-extend from bit 11.
    #[test]
    fn i_immediate_sign_extends(imm in -2048i32..=2047) {
        let inst = decode(addi(1, 2, imm)).unwrap();
        prop_assert_eq!(inst.imm, imm);
    }

    /// S-type immediates reassemble across their split encoding.
    #[test]
    fn s_immediate_reassembles(imm in -2048i32..=2047) {
        let inst = decode(s_type(0x23, 3, 2, 3, imm)).unwrap();
        prop_assert_eq!(inst.imm, imm);
    }

    /// Branch immediates reassemble with bit 0 clear.
    #[test]
    fn branch_immediate_reassembles(imm in -4096i32..=4095) {
        let even = imm & !1;
        let inst = decode(beq(1, 2, even)).unwrap();
        prop_assert_eq!(inst.imm, even);
    }

    /// Jump immediates cover the full 21-bit signed range.
    #[test]
    fn jump_immediate_reassembles(imm in -(1i32 << 20)..(1 << 20)) {
        let even = imm & !1;
        let inst = decode(jal(1, even)).unwrap();
        prop_assert_eq!(inst.imm, even);
    }
}

#[rstest]
#[case(0x00, true)]
#[case(0x13, false)]
#[case(0x33, false)]
#[case(0x7F, true)]
#[case(0x5B, true)]
fn unknown_opcodes_are_illegal(#[case] opcode: u8, #[case] illegal: bool) {
    let result = decode(u32::from(opcode));
    assert_eq!(result.is_err(), illegal);
    if illegal {
        assert_eq!(result, Err(Exception::IllegalInstruction));
    }
}

#[test]
fn r_type_fields_extract() {
    // ADD x5, x6, x7
    let inst = decode(0x0073_02B3).unwrap();
    assert_eq!(inst.opcode, 0x33);
    assert_eq!(inst.rd, 5);
    assert_eq!(inst.rs1, 6);
    assert_eq!(inst.rs2, 7);
    assert_eq!(inst.funct3, 0);
    assert_eq!(inst.funct7, 0);
}

#[test]
fn r4_type_splits_format_and_rs3() {
    // FMADD.D f1, f2, f3, f4
    let word = encode(&rvemu_core::isa::Instruction {
        opcode: 0x43,
        rd: 1,
        rs1: 2,
        rs2: 3,
        rs3: 4,
        funct7: 1,
        ..rvemu_core::isa::Instruction::default()
    });
    let inst = decode(word).unwrap();
    assert_eq!(inst.rs3, 4);
    assert_eq!(inst.funct7, 1);
    assert_eq!(inst.rd, 1);
}

#[test]
fn u_type_immediate_keeps_low_bits_clear() {
    let inst = decode(crate::common::lui(3, 0x12345 << 12)).unwrap();
    assert_eq!(inst.imm, 0x12345 << 12);
    assert_eq!(inst.imm & 0xFFF, 0);
}

#[test]
fn negative_branch_offset_round_trips() {
    let word = b_type(1, 4, 5, -16);
    let inst = decode(word).unwrap();
    assert_eq!(inst.imm, -16);
    assert_eq!(encode(&inst), word);
}

#[test]
fn compressed_words_are_rejected() {
    assert_eq!(decode16(0x4501), Err(Exception::IllegalInstruction));
}
