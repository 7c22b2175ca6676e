// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Tracing items

use crate::instruction::Instruction;
use crate::types::{Privilege, Record};

/// A single reconstructed instruction retirement
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Item {
    pc: u64,
    insn: Instruction,
    privilege: Privilege,
}

impl Item {
    pub(super) fn new(pc: u64, insn: Instruction, privilege: Privilege) -> Self {
        Self {
            pc,
            insn,
            privilege,
        }
    }

    /// Retrieve the address of the reconstructed instruction
    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// Retrieve the reconstructed [`Instruction`]
    pub fn instruction(&self) -> &Instruction {
        &self.insn
    }

    /// Retrieve the [`Privilege`] level the instruction executed under
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Convert this item into a retirement [`Record`]
    pub fn to_record(&self) -> Record {
        Record {
            valid: true,
            iaddr: self.pc,
            instr: self.insn.word,
            compressed: self.insn.size.is_compressed(),
            privilege: self.privilege,
            ..Default::default()
        }
    }
}
