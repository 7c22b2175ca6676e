// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Instruction decoding and control-flow classification
//!
//! Only the small subset of RISC-V instructions that is relevant for branch
//! tracing is decoded: conditional branches (including the PULP immediate
//! branches), jumps and trap returns. Everything else is treated as an
//! ordinary instruction.

pub mod format;

#[cfg(test)]
mod tests;

use core::fmt;

/// The bits from which instructions are disassembled
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bits {
    Bit16(u16),
    Bit32(u32),
    /// A 48 or 64 bit instruction, kept as raw bits alongside its byte length
    Wide(u64, u8),
}

impl Bits {
    /// Extract [`Bits`] from a raw byte slice
    ///
    /// Try to extract [`Bits`] from the beginning of the given slice, honoring
    /// the base instruction-length encoding of The RISC-V Instruction Set
    /// Manual Volume I: instructions are a sequence of 2-byte packets in
    /// little-endian order.
    ///
    /// Returns a tuple containing the [`Bits`] and the remaining part of the
    /// slice if successful. Returns `None` if the beginning does not appear to
    /// be a 16, 32, 48 or 64 bit instruction, or if the slice does not contain
    /// enough bytes.
    pub fn extract(data: &[u8]) -> Option<(Self, &[u8])> {
        let first = *data.first()?;
        match instr_len(first) {
            Some(2) => data
                .split_at_checked(2)
                .map(|(b, r)| (Self::Bit16(u16::from_le_bytes([b[0], b[1]])), r)),
            Some(4) => data
                .split_at_checked(4)
                .map(|(b, r)| (Self::Bit32(u32::from_le_bytes([b[0], b[1], b[2], b[3]])), r)),
            Some(len) => data.split_at_checked(len.into()).map(|(b, r)| {
                let word = b
                    .iter()
                    .enumerate()
                    .fold(0u64, |w, (i, b)| w | (u64::from(*b) << (8 * i)));
                (Self::Wide(word, len), r)
            }),
            None => None,
        }
    }

    /// Retrieve the raw instruction word
    pub fn word(self) -> u64 {
        match self {
            Self::Bit16(b) => b.into(),
            Self::Bit32(b) => b.into(),
            Self::Wide(b, _) => b,
        }
    }

    /// Retrieve the instruction's [`Size`]
    pub fn size(self) -> Size {
        match self {
            Self::Bit16(_) => Size::Compressed,
            Self::Bit32(_) => Size::Normal,
            Self::Wide(_, 6) => Size::Wide48,
            Self::Wide(_, _) => Size::Wide64,
        }
    }
}

/// Determine an instruction's byte length from its low bits
///
/// Returns `None` for the reserved longer-than-64-bit encodings.
const fn instr_len(low: u8) -> Option<u8> {
    if low & 0x03 != 0x03 {
        Some(2)
    } else if low & 0x1f != 0x1f {
        Some(4)
    } else if low & 0x3f == 0x1f {
        Some(6)
    } else if low & 0x7f == 0x3f {
        Some(8)
    } else {
        None
    }
}

#[repr(u32)]
#[derive(Eq, PartialEq)]
enum OpCode {
    Branch = 0b1100011,
    Jalr = 0b1100111,
    Jal = 0b1101111,
    System = 0b1110011,
    HwLoop = 0b1111011,
    Ignored,
}

impl From<u32> for OpCode {
    fn from(value: u32) -> Self {
        use OpCode::*;

        const MASK: u32 = 0x7f;
        match value & MASK {
            x if x == Branch as u32 => Branch,
            x if x == Jalr as u32 => Jalr,
            x if x == Jal as u32 => Jal,
            x if x == System as u32 => System,
            x if x == HwLoop as u32 => HwLoop,
            _ => Ignored,
        }
    }
}

/// Control-flow changing instructions known to the tracing algorithm
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    // SYS (R)
    mret,
    sret,
    uret,
    // B
    beq(format::TypeB),
    bne(format::TypeB),
    blt(format::TypeB),
    bge(format::TypeB),
    bltu(format::TypeB),
    bgeu(format::TypeB),
    // PULP immediate branches
    p_beqimm(format::TypeB),
    p_bneimm(format::TypeB),
    // CB
    c_beqz(format::TypeB),
    c_bnez(format::TypeB),
    // J
    jal(format::TypeJ),
    // CJ
    c_j(format::TypeJ),
    c_jal(format::TypeJ),
    // CR
    c_jr(format::TypeR),
    c_jalr(format::TypeR),
    // I
    jalr(format::TypeI),
}

impl Kind {
    /// Decode a 32 bit ("normal") instruction
    ///
    /// Returns an instruction if it is part of the known control-flow subset.
    /// As only a small part of all RISC-V instructions is relevant, unknown
    /// instructions are not considered an error.
    pub fn decode_32(insn: u32) -> Option<Self> {
        let funct3 = (insn >> 12) & 0x7;

        match OpCode::from(insn) {
            OpCode::Branch => match funct3 {
                0b000 => Some(Self::beq(insn.into())),
                0b001 => Some(Self::bne(insn.into())),
                0b010 => Some(Self::p_beqimm(insn.into())),
                0b011 => Some(Self::p_bneimm(insn.into())),
                0b100 => Some(Self::blt(insn.into())),
                0b101 => Some(Self::bge(insn.into())),
                0b110 => Some(Self::bltu(insn.into())),
                0b111 => Some(Self::bgeu(insn.into())),
                _ => None,
            },
            OpCode::Jalr if funct3 == 0 => Some(Self::jalr(insn.into())),
            OpCode::Jal => Some(Self::jal(insn.into())),
            OpCode::System => match insn >> 7 {
                0b000000000010_00000_000_00000 => Some(Self::uret),
                0b000100000010_00000_000_00000 => Some(Self::sret),
                0b001100000010_00000_000_00000 => Some(Self::mret),
                _ => None,
            },
            _ => None,
        }
    }

    /// Decode a 16 bit ("compressed") instruction
    ///
    /// Returns an instruction if it is part of the known control-flow subset.
    pub fn decode_16(insn: u16) -> Option<Self> {
        let op = insn & 0x3;
        let funct3 = insn >> 13;
        match (op, funct3) {
            (0b01, 0b001) => Some(Self::c_jal(insn.into())),
            (0b01, 0b101) => Some(Self::c_j(insn.into())),
            (0b01, 0b110) => Some(Self::c_beqz(insn.into())),
            (0b01, 0b111) => Some(Self::c_bnez(insn.into())),
            (0b10, 0b100) => {
                let data = format::TypeR::from(insn);
                let bit12 = (insn >> 12) & 0x1;
                match (bit12, data.rs1, data.rs2) {
                    (0, r, 0) if r != 0 => Some(Self::c_jr(data)),
                    (1, r, 0) if r != 0 => Some(Self::c_jalr(data)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Determine the branch target
    ///
    /// If [`Self`] refers to a conditional branch, returns the target relative
    /// to this instruction. Jump instructions are not considered branches.
    pub fn branch_target(self) -> Option<i16> {
        match self {
            Self::beq(d)
            | Self::bne(d)
            | Self::blt(d)
            | Self::bge(d)
            | Self::bltu(d)
            | Self::bgeu(d)
            | Self::p_beqimm(d)
            | Self::p_bneimm(d)
            | Self::c_beqz(d)
            | Self::c_bnez(d) => Some(d.imm),
            _ => None,
        }
    }

    /// Determine the inferable jump target
    ///
    /// If [`Self`] refers to a jump whose target is encoded in the
    /// instruction itself, returns that target relative to this instruction.
    /// `jalr` targets are never considered inferable, register contents are
    /// not tracked.
    pub fn inferable_jump_target(self) -> Option<i32> {
        match self {
            Self::jal(d) => Some(d.imm),
            Self::c_jal(d) | Self::c_j(d) => Some(d.imm),
            _ => None,
        }
    }

    /// Determine whether this instruction returns from a trap
    pub fn is_return_from_trap(self) -> bool {
        matches!(self, Self::uret | Self::sret | Self::mret)
    }

    /// Determine whether this instruction is a register-indirect jump
    pub fn is_indirect_jump(self) -> bool {
        matches!(self, Self::jalr(_) | Self::c_jr(_) | Self::c_jalr(_))
    }

    /// Determine whether this instruction is a plain function return
    ///
    /// Matches `jalr zero, 0(ra)` and `c.jr ra`, the canonical `ret` forms.
    pub fn is_return(self) -> bool {
        matches!(
            self,
            Self::jalr(format::TypeI {
                rd: 0,
                rs1: 1,
                imm: 0
            }) | Self::c_jr(format::TypeR { rs1: 1, .. })
        )
    }

    /// Determine whether this instruction is a function call
    ///
    /// A call is any jump-and-link writing the return address register.
    pub fn is_call(self) -> bool {
        matches!(
            self,
            Self::jal(format::TypeJ { rd: 1, .. })
                | Self::jalr(format::TypeI { rd: 1, .. })
                | Self::c_jal(_)
                | Self::c_jalr(_)
        )
    }

    /// Determine whether this instruction returns and calls at once
    ///
    /// Matches `jalr ra, 0(ra)` and `c.jalr ra`, which simultaneously pop
    /// and push a return address.
    pub fn is_coroutine_return(self) -> bool {
        matches!(
            self,
            Self::jalr(format::TypeI {
                rd: 1,
                rs1: 1,
                imm: 0
            }) | Self::c_jalr(format::TypeR { rs1: 1, .. })
        )
    }
}

/// Control-flow class of an instruction
///
/// The class determines how the compressor and the tracer treat an
/// instruction. A single instruction has exactly one class; overlapping
/// categories are resolved in the order of the variants below.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Class {
    /// Return from trap (`mret`, `sret`, `uret`)
    ExceptionReturn,
    /// `jalr ra, 0(ra)`: returns and calls at the same time
    CoRet,
    /// Plain function return (`ret`, `c.ret`)
    Ret,
    /// Jump-and-link writing the return address register
    Call,
    /// Register-indirect jump that is none of the above
    UnpredJump,
    /// Conditional branch, contributes to the branch map
    Branch,
    /// Any other instruction
    Other,
}

/// A single decoded RISC-V instruction
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    /// Raw instruction word
    pub word: u64,
    pub size: Size,
    /// Decoded control-flow kind, if the instruction is part of the subset
    pub kind: Option<Kind>,
}

impl Instruction {
    /// Decode an instruction from its raw word
    ///
    /// The word's low bits select between the 16 and 32 bit decoders.
    pub fn from_word(word: u64) -> Self {
        if word & 0x3 != 0x3 {
            Bits::Bit16(word as u16).into()
        } else {
            Bits::Bit32(word as u32).into()
        }
    }

    /// Classify this instruction
    pub fn classify(&self) -> Class {
        let Some(kind) = self.kind else {
            return Class::Other;
        };
        if kind.is_return_from_trap() {
            Class::ExceptionReturn
        } else if kind.is_coroutine_return() {
            Class::CoRet
        } else if kind.is_return() {
            Class::Ret
        } else if kind.is_call() && kind.is_indirect_jump() {
            Class::Call
        } else if kind.is_indirect_jump() {
            Class::UnpredJump
        } else if kind.branch_target().is_some() {
            Class::Branch
        } else if kind.is_call() {
            Class::Call
        } else {
            Class::Other
        }
    }

    /// Determine whether this instruction is a conditional branch
    pub fn is_branch(&self) -> bool {
        self.kind.and_then(Kind::branch_target).is_some()
    }

    /// Determine whether this is an unpredictable discontinuity
    ///
    /// Register-indirect jumps and trap returns have targets that cannot be
    /// derived from the instruction encoding. With `implicit_ret`, plain
    /// function returns are excluded since the decoder predicts their targets
    /// from its return address stack.
    pub fn is_unpredictable(&self, implicit_ret: bool) -> bool {
        let Some(kind) = self.kind else {
            return false;
        };
        let jump = kind.is_indirect_jump() || kind.is_return_from_trap();
        jump && !(implicit_ret && kind.is_return())
    }

    /// Address of the instruction following this one at `iaddr`
    pub fn link_address(&self, iaddr: u64) -> u64 {
        crate::truncate_addr(iaddr.wrapping_add(self.size.bytes()))
    }
}

impl Default for Instruction {
    fn default() -> Self {
        Self {
            word: 0,
            size: Size::Normal,
            kind: None,
        }
    }
}

impl From<Bits> for Instruction {
    fn from(bits: Bits) -> Self {
        let kind = match bits {
            Bits::Bit16(b) => Kind::decode_16(b),
            Bits::Bit32(b) => Kind::decode_32(b),
            Bits::Wide(..) => None,
        };
        Self {
            word: bits.word(),
            size: bits.size(),
            kind,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{kind:?}"),
            None => write!(f, ".word {:#x}", self.word),
        }
    }
}

/// Byte length of a single RISC-V instruction
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Size {
    Compressed,
    Normal,
    Wide48,
    Wide64,
}

impl Size {
    /// Retrieve the size in bytes
    pub const fn bytes(self) -> u64 {
        match self {
            Self::Compressed => 2,
            Self::Normal => 4,
            Self::Wide48 => 6,
            Self::Wide64 => 8,
        }
    }

    /// Determine whether this is the 16 bit compressed size
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Compressed)
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::Normal
    }
}

/// Determine whether a raw instruction word is unsupported for tracing
///
/// The PULP hardware loop instructions (custom opcode `0x7b`) manipulate
/// control flow in ways the packet formats cannot express. Encountering one
/// is a fatal compression error.
pub fn is_unsupported_word(word: u64) -> bool {
    let word = word as u32;
    OpCode::from(word) == OpCode::HwLoop && (word >> 12) & 0x7 <= 0b101
}
