// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

/// Information associated to a trap
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Info {
    /// Exception cause code
    pub ecause: u32,
    /// Whether the trap is an interrupt rather than an exception
    pub interrupt: bool,
    /// Trap value register contents
    pub tval: u64,
}

impl Info {
    /// Create trap info for an exception
    pub fn exception(ecause: u32, tval: u64) -> Self {
        Self {
            ecause,
            interrupt: false,
            tval,
        }
    }

    /// Create trap info for an interrupt
    pub fn interrupt(ecause: u32) -> Self {
        Self {
            ecause,
            interrupt: true,
            tval: 0,
        }
    }
}
