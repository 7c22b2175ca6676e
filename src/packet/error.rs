// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Packet-specific error types

use core::fmt;
use core::num::NonZeroUsize;

/// Packet decode/encode errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The alignment value is out of range
    BadAlignment(u8),
    /// The message type is not known to us
    UnknownMsgType(u8),
    /// The packet violates the wire framing
    BadPacket,
    /// Some more bytes of data are required for the operation to succeed
    InsufficientData(NonZeroUsize),
    /// The target buffer is too small for the encoded data
    BufferTooSmall,
    /// The packet cannot exist under the current configuration
    ///
    /// A differential branch packet in full address mode is the prime
    /// example.
    BadConfig,
    /// The packet format is reserved and not implemented
    Unimplemented,
}

impl core::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadAlignment(a) => write!(f, "bad alignment value: {a}"),
            Self::UnknownMsgType(t) => write!(f, "unknown message type {t}"),
            Self::BadPacket => write!(f, "malformed packet"),
            Self::InsufficientData(n) => write!(f, "at least {n} more bytes of data are required"),
            Self::BufferTooSmall => write!(f, "reached end of buffer while encoding"),
            Self::BadConfig => write!(f, "packet cannot exist under this configuration"),
            Self::Unimplemented => write!(f, "reserved packet format"),
        }
    }
}
