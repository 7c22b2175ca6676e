// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Definitions of the various packet payloads

use core::fmt;

use crate::config::Config;
use crate::types::branch;
use crate::{BRANCHLEN, FORMATLEN, MSGTYPELEN, TIMELEN, XLEN, xlen_mask};

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::sync::Synchronization;
use super::{Error, util};
use super::{
    FMT_ADDR_ONLY, FMT_BRANCH_DIFF, FMT_BRANCH_FULL, FMT_SYNC, MSG_SOFTWARE, MSG_TIMER, MSG_TRACE,
};

/// A trace packet payload
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Payload {
    /// A regular trace packet
    Trace(Trace),
    /// User-written software payload
    Software(Software),
    /// Timer sample
    Timer(Timer),
}

impl Payload {
    /// Retrieve the encapsulated trace payload
    ///
    /// Returns [`None`] if this payload is a software or timer payload.
    pub fn as_trace(&self) -> Option<&Trace> {
        match self {
            Self::Trace(t) => Some(t),
            _ => None,
        }
    }

    /// Number of payload bits after the message type and format fields
    ///
    /// This is the width the framing length prefix is derived from.
    pub(super) fn field_bits(&self, config: &Config) -> Result<u32, Error> {
        match self {
            Self::Trace(t) => t.field_bits(config),
            Self::Software(_) => Ok(XLEN),
            Self::Timer(_) => Ok(TIMELEN),
        }
    }

    /// Number of payload bits including the format field
    ///
    /// This matches the length bookkeeping of the hardware trace debugger:
    /// format and fields, without the message type and the framing prefix.
    pub fn payload_bits(&self, config: &Config) -> Result<u32, Error> {
        match self {
            Self::Trace(t) => t.field_bits(config).map(|b| b + FORMATLEN),
            _ => self.field_bits(config),
        }
    }

    /// Number of bits the framed packet occupies on the wire
    pub fn framed_bits(&self, config: &Config) -> Result<u32, Error> {
        self.field_bits(config)
            .map(|b| (b.div_ceil(8) + 1) * 8)
    }

    pub(super) fn encode<B: AsMut<[u8]>>(&self, encoder: &mut Encoder<B>) -> Result<(), Error> {
        match self {
            Self::Trace(t) => {
                encoder.write_bits(MSG_TRACE.into(), MSGTYPELEN)?;
                t.encode(encoder)
            }
            Self::Software(s) => {
                encoder.write_bits(MSG_SOFTWARE.into(), MSGTYPELEN)?;
                encoder.write_bits(s.userdata.into(), XLEN)
            }
            Self::Timer(t) => {
                encoder.write_bits(MSG_TIMER.into(), MSGTYPELEN)?;
                encoder.write_bits(t.time.into(), TIMELEN)
            }
        }
    }

    pub(super) fn decode(decoder: &mut Decoder) -> Result<Self, Error> {
        let msg_type = decoder.read_bits(MSGTYPELEN)? as u8;
        match msg_type {
            MSG_TRACE => Trace::decode(decoder).map(Into::into),
            MSG_SOFTWARE => {
                let userdata = decoder.read_bits(XLEN)? as u64;
                Ok(Software { userdata }.into())
            }
            MSG_TIMER => {
                let time = decoder.read_bits(TIMELEN)? as u64;
                Ok(Timer { time }.into())
            }
            unknown => Err(Error::UnknownMsgType(unknown)),
        }
    }
}

impl From<Trace> for Payload {
    fn from(t: Trace) -> Self {
        Self::Trace(t)
    }
}

impl From<Software> for Payload {
    fn from(s: Software) -> Self {
        Self::Software(s)
    }
}

impl From<Timer> for Payload {
    fn from(t: Timer) -> Self {
        Self::Timer(t)
    }
}

impl From<Branch> for Payload {
    fn from(b: Branch) -> Self {
        Trace::Branch(b).into()
    }
}

impl From<AddressInfo> for Payload {
    fn from(a: AddressInfo) -> Self {
        Trace::Address(a).into()
    }
}

impl From<Synchronization> for Payload {
    fn from(s: Synchronization) -> Self {
        Trace::Sync(s).into()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace(t) => fmt::Display::fmt(t, f),
            Self::Software(s) => write!(f, "SOFTWARE userdata: {:#x}", s.userdata),
            Self::Timer(t) => write!(f, "TIMER time: {:#x}", t.time),
        }
    }
}

/// A regular trace payload
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Trace {
    /// Branch map, possibly with an address
    Branch(Branch),
    /// Address without branch information
    Address(AddressInfo),
    /// Synchronization
    Sync(Synchronization),
}

impl Trace {
    /// Retrieve the [`AddressInfo`] in this payload
    pub fn get_address_info(&self) -> Option<&AddressInfo> {
        match self {
            Self::Branch(b) => b.address.as_ref(),
            Self::Address(a) => Some(a),
            Self::Sync(_) => None,
        }
    }

    fn field_bits(&self, config: &Config) -> Result<u32, Error> {
        match self {
            Self::Branch(b) => b.field_bits(config),
            Self::Address(a) => a.field_bits(config),
            Self::Sync(s) => s.field_bits(config),
        }
    }

    fn encode<B: AsMut<[u8]>>(&self, encoder: &mut Encoder<B>) -> Result<(), Error> {
        match self {
            Self::Branch(b) => b.encode(encoder),
            Self::Address(a) => {
                encoder.write_bits(FMT_ADDR_ONLY.into(), FORMATLEN)?;
                a.encode(encoder, true)
            }
            Self::Sync(s) => {
                encoder.write_bits(FMT_SYNC.into(), FORMATLEN)?;
                s.encode(encoder)
            }
        }
    }

    fn decode(decoder: &mut Decoder) -> Result<Self, Error> {
        match decoder.read_bits(FORMATLEN)? as u8 {
            fmt @ (FMT_BRANCH_FULL | FMT_BRANCH_DIFF) => {
                Branch::decode(decoder, fmt == FMT_BRANCH_DIFF).map(Self::Branch)
            }
            FMT_ADDR_ONLY => AddressInfo::decode_extendable(decoder, None).map(Self::Address),
            FMT_SYNC => Synchronization::decode(decoder).map(Self::Sync),
            _ => unreachable!(),
        }
    }
}

impl From<Branch> for Trace {
    fn from(b: Branch) -> Self {
        Self::Branch(b)
    }
}

impl From<AddressInfo> for Trace {
    fn from(a: AddressInfo) -> Self {
        Self::Address(a)
    }
}

impl From<Synchronization> for Trace {
    fn from(s: Synchronization) -> Self {
        Self::Sync(s)
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(b) => write!(f, "BRANCH {b}"),
            Self::Address(a) => write!(f, "ADDR {a}"),
            Self::Sync(s) => fmt::Display::fmt(s, f),
        }
    }
}

/// Branch payload
///
/// Sent when recorded branch information must be reported, either because
/// the branch map is full or because an address must be reported and there
/// has been at least one branch since the previous packet. A payload without
/// address denotes a full map of 31 entries whose final instruction is not a
/// discontinuity; it is encoded with a branch count of zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Branch {
    pub branch_map: branch::Map,
    pub address: Option<AddressInfo>,
}

impl Branch {
    fn field_bits(&self, config: &Config) -> Result<u32, Error> {
        let map = &self.branch_map;
        match self.address.as_ref() {
            Some(address) => {
                if map.is_empty() {
                    return Err(Error::BadPacket);
                }
                let addr_bits = address.field_bits(config)?;
                Ok(BRANCHLEN + util::branch_map_len(map.count()) + addr_bits)
            }
            None => Ok(BRANCHLEN + util::full_map_keep(map.raw_bits(), config)),
        }
    }

    fn encode<B: AsMut<[u8]>>(&self, encoder: &mut Encoder<B>) -> Result<(), Error> {
        let format = match self.address.as_ref().map(|a| a.kind) {
            Some(AddressKind::Differential) => FMT_BRANCH_DIFF,
            _ => FMT_BRANCH_FULL,
        };
        encoder.write_bits(format.into(), FORMATLEN)?;

        if let Some(address) = self.address.as_ref() {
            if self.branch_map.is_empty() {
                return Err(Error::BadPacket);
            }
            let count = self.branch_map.count();
            encoder.write_bits(count.into(), BRANCHLEN)?;
            encoder.write_bits(
                self.branch_map.raw_bits().into(),
                util::branch_map_len(count),
            )?;
            address.encode(encoder, true)
        } else {
            encoder.write_bits(0u128, BRANCHLEN)?;
            let bits = self.branch_map.raw_bits();
            let keep = util::full_map_keep(bits, encoder.config());
            encoder.write_extendable(sign_extend(bits.into(), 31), keep)
        }
    }

    fn decode(decoder: &mut Decoder, differential: bool) -> Result<Self, Error> {
        if differential && decoder.config().full_address {
            return Err(Error::BadConfig);
        }

        let branches = decoder.read_bits(BRANCHLEN)? as u8;
        if branches == 0 {
            let bits = decoder.read_extendable()? as u32 & 0x7fff_ffff;
            Ok(Self {
                branch_map: branch::Map::new(31, bits),
                address: None,
            })
        } else {
            let bits = decoder.read_bits(util::branch_map_len(branches))? as u32;
            let branch_map = branch::Map::new(branches, bits);
            let kind = if differential {
                AddressKind::Differential
            } else {
                AddressKind::Absolute
            };
            let address = AddressInfo::decode_extendable(decoder, Some(kind))?;
            Ok(Self {
                branch_map,
                address: Some(address),
            })
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.branch_map, f)?;
        if let Some(address) = self.address {
            write!(f, ", {address}")?;
        }
        Ok(())
    }
}

/// Address info payload
///
/// On its own this represents an address-only packet, reporting the target
/// of an unpredictable discontinuity when no branch information is pending.
/// It also forms the address part of [`Branch`] payloads. In delta mode the
/// address is the previous packet address minus the reported instruction
/// address, and redundant high bits are dropped on the wire.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AddressInfo {
    /// Representation of the address
    pub kind: AddressKind,
    /// Absolute address, or the difference to the previous packet's address
    pub address: u64,
}

impl AddressInfo {
    /// Create an absolute address info
    pub fn absolute(address: u64) -> Self {
        Self {
            kind: AddressKind::Absolute,
            address: address & xlen_mask(),
        }
    }

    /// Create a differential address info
    pub fn differential(address: u64) -> Self {
        Self {
            kind: AddressKind::Differential,
            address: address & xlen_mask(),
        }
    }

    /// Resolve the absolute address this info refers to
    ///
    /// Differential addresses are subtracted from the anchor, i.e. the last
    /// address carried in a packet.
    pub fn resolve(&self, anchor: u64) -> u64 {
        match self.kind {
            AddressKind::Absolute => self.address,
            AddressKind::Differential => anchor.wrapping_sub(self.address) & xlen_mask(),
        }
    }

    fn field_bits(&self, config: &Config) -> Result<u32, Error> {
        if config.full_address && self.kind == AddressKind::Differential {
            return Err(Error::BadConfig);
        }
        Ok(util::address_keep(self.address, config))
    }

    fn encode<B: AsMut<[u8]>>(&self, encoder: &mut Encoder<B>, last: bool) -> Result<(), Error> {
        let keep = self.field_bits(encoder.config())?;
        let value = sign_extend_xlen(self.address);
        if last {
            encoder.write_extendable(value, keep)
        } else {
            encoder.write_signed(value, keep)
        }
    }

    /// Decode an address occupying the rest of the current packet
    ///
    /// The address is sign-extended at the packet boundary. Without a given
    /// [`AddressKind`], the kind is implied by the address mode in effect.
    fn decode_extendable(decoder: &mut Decoder, kind: Option<AddressKind>) -> Result<Self, Error> {
        let kind = kind.unwrap_or(if decoder.config().full_address {
            AddressKind::Absolute
        } else {
            AddressKind::Differential
        });
        let address = decoder.read_extendable()? as u64 & xlen_mask();
        Ok(Self { kind, address })
    }
}

impl fmt::Display for AddressInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AddressKind::Absolute => write!(f, "address: {:#x}", self.address),
            AddressKind::Differential => write!(f, "address: -{:#x}", self.address),
        }
    }
}

/// Representation of an address on the wire
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AddressKind {
    /// The address is an absolute instruction address
    Absolute,
    /// The address is relative to the previous packet's address
    Differential,
}

/// User-written software payload
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Software {
    pub userdata: u64,
}

/// Timer sample payload
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timer {
    pub time: u64,
}

/// Sign-extend an [`XLEN`]-bit value into an [`i128`]
pub(super) fn sign_extend_xlen(value: u64) -> i128 {
    sign_extend(value, XLEN)
}

/// Sign-extend a value of the given width into an [`i128`]
fn sign_extend(value: u64, width: u32) -> i128 {
    let shift = u128::BITS - width;
    ((value as i128) << shift) >> shift
}
