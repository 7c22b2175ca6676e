// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Compression errors

use core::fmt;

/// Errors that may be emitted during compression
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An instruction cannot be represented in the trace
    ///
    /// Hardware loop instructions manipulate control flow in ways the packet
    /// formats cannot express.
    UnsupportedInstruction { word: u64, iaddr: u64 },
    /// A (named) feature is not implemented
    Unimplemented(&'static str),
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedInstruction { word, iaddr } => write!(
                f,
                "instruction {word:#x} at {iaddr:#x} is not supported for compression"
            ),
            Self::Unimplemented(what) => write!(f, "{what} is not supported"),
        }
    }
}
