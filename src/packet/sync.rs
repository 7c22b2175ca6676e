// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Synchronization payloads
//!
//! Synchronization packets carry a full absolute address and the current
//! privilege level. They are sent for the first traced instruction, after
//! privilege changes and exceptions, and when resynchronization is due.

use core::fmt;

use crate::config::Config;
use crate::types::{Privilege, trap};
use crate::{CAUSELEN, CONTEXTLEN, FORMATLEN, PRIVLEN, XLEN, xlen_mask};

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::{Error, SF_CONTEXT, SF_EXCEPTION, SF_START};

/// Synchronization payload
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Synchronization {
    Start(Start),
    Exception(Exception),
    /// Reserved for context switches; not implemented
    Context,
}

impl Synchronization {
    /// Retrieve the address carried by this payload
    pub fn address(&self) -> Option<u64> {
        match self {
            Self::Start(s) => Some(s.address),
            Self::Exception(e) => Some(e.address),
            Self::Context => None,
        }
    }

    /// Retrieve the privilege level carried by this payload
    pub fn privilege(&self) -> Option<Privilege> {
        match self {
            Self::Start(s) => Some(s.privilege),
            Self::Exception(e) => Some(e.privilege),
            Self::Context => None,
        }
    }

    /// Retrieve the branch bit carried by this payload
    ///
    /// A set bit means the reported instruction is a branch that was not
    /// taken.
    pub fn branch(&self) -> Option<bool> {
        match self {
            Self::Start(s) => Some(s.branch),
            Self::Exception(e) => Some(e.branch),
            Self::Context => None,
        }
    }

    pub(super) fn field_bits(&self, _config: &Config) -> Result<u32, Error> {
        let common = FORMATLEN + PRIVLEN + CONTEXTLEN + 1 + XLEN;
        match self {
            Self::Start(_) => Ok(common),
            Self::Exception(_) => Ok(common + CAUSELEN + 1 + XLEN),
            Self::Context => Err(Error::Unimplemented),
        }
    }

    pub(super) fn encode<B: AsMut<[u8]>>(&self, encoder: &mut Encoder<B>) -> Result<(), Error> {
        let (subformat, branch, privilege, address) = match self {
            Self::Start(s) => (SF_START, s.branch, s.privilege, s.address),
            Self::Exception(e) => (SF_EXCEPTION, e.branch, e.privilege, e.address),
            Self::Context => return Err(Error::Unimplemented),
        };

        encoder.write_bits(subformat.into(), FORMATLEN)?;
        encoder.write_bits(privilege.raw().into(), PRIVLEN)?;
        encoder.write_bits(0, CONTEXTLEN)?;
        encoder.write_bits(branch.into(), 1)?;
        encoder.write_bits((address & xlen_mask()).into(), XLEN)?;

        if let Self::Exception(e) = self {
            encoder.write_bits(e.info.ecause.into(), CAUSELEN)?;
            encoder.write_bits(e.info.interrupt.into(), 1)?;
            encoder.write_bits((e.info.tval & xlen_mask()).into(), XLEN)?;
        }
        Ok(())
    }

    pub(super) fn decode(decoder: &mut Decoder) -> Result<Self, Error> {
        let subformat = decoder.read_bits(FORMATLEN)? as u8;
        if subformat == SF_CONTEXT {
            return Err(Error::Unimplemented);
        }
        if subformat != SF_START && subformat != SF_EXCEPTION {
            return Err(Error::BadPacket);
        }

        let privilege = Privilege::new(decoder.read_bits(PRIVLEN)? as u8);
        decoder.read_bits(CONTEXTLEN)?;
        let branch = decoder.read_bits(1)? != 0;
        let address = decoder.read_bits(XLEN)? as u64;

        if subformat == SF_START {
            return Ok(Start {
                branch,
                privilege,
                address,
            }
            .into());
        }

        let ecause = decoder.read_bits(CAUSELEN)? as u32;
        let interrupt = decoder.read_bits(1)? != 0;
        let tval = decoder.read_bits(XLEN)? as u64;
        Ok(Exception {
            branch,
            privilege,
            address,
            info: trap::Info {
                ecause,
                interrupt,
                tval,
            },
        }
        .into())
    }
}

impl From<Start> for Synchronization {
    fn from(s: Start) -> Self {
        Self::Start(s)
    }
}

impl From<Exception> for Synchronization {
    fn from(e: Exception) -> Self {
        Self::Exception(e)
    }
}

impl fmt::Display for Synchronization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(s) => write!(
                f,
                "SYNC start, priv {}, branch {}, address {:#x}",
                s.privilege, s.branch as u8, s.address
            ),
            Self::Exception(e) => write!(
                f,
                "SYNC exception, priv {}, branch {}, address {:#x}, \
                 ecause {:#x}, interrupt {}, tval {:#x}",
                e.privilege,
                e.branch as u8,
                e.address,
                e.info.ecause,
                e.info.interrupt as u8,
                e.info.tval
            ),
            Self::Context => write!(f, "SYNC context (reserved)"),
        }
    }
}

/// Start of trace
///
/// Sent for the first traced instruction, on privilege changes and when
/// resynchronization is necessary without pending branch information.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Start {
    /// The reported instruction is a branch that was not taken
    pub branch: bool,
    pub privilege: Privilege,
    /// Full address of the reported instruction
    pub address: u64,
}

/// Exception synchronization
///
/// Sent for the first instruction of a trap handler, carrying the trapped
/// instruction's cause and trap value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Exception {
    /// The reported instruction is a branch that was not taken
    pub branch: bool,
    pub privilege: Privilege,
    /// Full address of the reported instruction
    pub address: u64,
    pub info: trap::Info,
}
