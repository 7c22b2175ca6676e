// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

#[test]
fn extract_lengths() {
    assert_eq!(
        Bits::extract(&[0x01, 0x00, 0xff]),
        Some((Bits::Bit16(0x0001), &[0xff][..]))
    );
    assert_eq!(
        Bits::extract(&[0x13, 0x05, 0x15, 0x00]),
        Some((Bits::Bit32(0x0015_0513), &[][..]))
    );
    // 48 and 64 bit encodings are stepped over but not decoded
    let wide48 = [0x1f, 0x00, 0x00, 0x00, 0x00, 0x00];
    assert_eq!(
        Bits::extract(&wide48).map(|(b, _)| b.size()),
        Some(Size::Wide48)
    );
    let wide64 = [0x3f, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    assert_eq!(
        Bits::extract(&wide64).map(|(b, _)| b.size()),
        Some(Size::Wide64)
    );
    // reserved longer-than-64-bit form
    assert_eq!(Bits::extract(&[0x7f; 12]), None);
    // truncated input
    assert_eq!(Bits::extract(&[0x13, 0x05]), None);
    assert_eq!(Bits::extract(&[]), None);
}

#[test]
fn decode_branches() {
    // beq a0, a1, +8
    let insn = Instruction::from_word(0x00b5_0463);
    assert!(insn.is_branch());
    assert_eq!(insn.kind.unwrap().branch_target(), Some(8));
    assert_eq!(insn.classify(), Class::Branch);

    // c.beqz a0, +6
    let insn = Instruction::from_word(0xc119);
    assert_eq!(insn.size, Size::Compressed);
    assert_eq!(insn.kind.unwrap().branch_target(), Some(6));

    // p.bneimm encodes like a branch with funct3 0b011
    let insn = Instruction::from_word(0x00b5_3463);
    assert_eq!(insn.classify(), Class::Branch);
}

#[test]
fn decode_jumps() {
    // jal ra, +8
    let insn = Instruction::from_word(0x0080_00ef);
    assert_eq!(insn.kind.unwrap().inferable_jump_target(), Some(8));
    assert_eq!(insn.classify(), Class::Call);
    assert!(!insn.is_unpredictable(false));

    // j -16
    let insn = Instruction::from_word(0xff1f_f06f);
    assert_eq!(insn.kind.unwrap().inferable_jump_target(), Some(-16));
    assert_eq!(insn.classify(), Class::Other);

    // jalr t0, 0(t1)
    let insn = Instruction::from_word(0x0003_02e7);
    assert_eq!(insn.classify(), Class::UnpredJump);
    assert!(insn.is_unpredictable(false));
    assert!(insn.is_unpredictable(true));
}

#[test]
fn decode_returns() {
    // ret
    let insn = Instruction::from_word(0x0000_8067);
    assert_eq!(insn.classify(), Class::Ret);
    assert!(insn.is_unpredictable(false));
    assert!(!insn.is_unpredictable(true));

    // c.ret
    let insn = Instruction::from_word(0x8082);
    assert_eq!(insn.classify(), Class::Ret);
    assert!(!insn.is_unpredictable(true));

    // jalr ra, 0(ra) returns and calls at once
    let insn = Instruction::from_word(0x0000_80e7);
    assert_eq!(insn.classify(), Class::CoRet);
    assert!(insn.is_unpredictable(true));
}

#[test]
fn decode_trap_returns() {
    for (word, kind) in [
        (0x3020_0073, Kind::mret),
        (0x1020_0073, Kind::sret),
        (0x0020_0073, Kind::uret),
    ] {
        let insn = Instruction::from_word(word);
        assert_eq!(insn.kind, Some(kind));
        assert_eq!(insn.classify(), Class::ExceptionReturn);
        assert!(insn.is_unpredictable(true));
    }
}

#[test]
fn decode_compressed_jumps() {
    // c.jr a5
    let insn = Instruction::from_word(0x8782);
    assert_eq!(insn.classify(), Class::UnpredJump);

    // c.jalr a0
    let insn = Instruction::from_word(0x9502);
    assert_eq!(insn.classify(), Class::Call);
    assert!(insn.is_unpredictable(true));

    // c.ebreak is not part of the known subset
    let insn = Instruction::from_word(0x9002);
    assert_eq!(insn.kind, None);
    assert_eq!(insn.classify(), Class::Other);
}

#[test]
fn hardware_loops_are_unsupported() {
    // lp.setupi and friends live on the custom 0x7b opcode
    for funct3 in 0..=0b101u64 {
        assert!(is_unsupported_word((funct3 << 12) | 0x7b));
    }
    assert!(!is_unsupported_word(0x0000_607b));
    assert!(!is_unsupported_word(0x0000_8067));
}

#[test]
fn link_addresses() {
    let insn = Instruction::from_word(0x0080_00ef);
    assert_eq!(insn.link_address(0x1000), 0x1004);
    let insn = Instruction::from_word(0x9502);
    assert_eq!(insn.link_address(0x1000), 0x1002);
}
