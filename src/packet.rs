// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Trace packets and their bit-level codec
//!
//! This module provides the [payload][Payload] model of the PULP trace
//! packet formats as well as an [`Encoder`] and a [`Decoder`] for the wire
//! representation.
//!
//! Packets are laid out on a bit stream: fields are concatenated
//! least-significant-field first, and the byte stream is the little-endian
//! image of the resulting bit vector. On the wire, every packet is prefixed
//! with a [`PULPPKTLEN`][crate::PULPPKTLEN]-bit length field; consecutive
//! packets are packed back-to-back at bit granularity, so a packet may start
//! at any bit offset within a byte. Addresses (and, optionally, full branch
//! maps) are truncated to their sign-extendable prefix and restored by
//! sign-extending at the packet boundary.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod payload;
pub mod sync;
pub mod util;

#[cfg(test)]
mod tests;

pub use decoder::Decoder;
pub use encoder::{Encoder, serialize_packet};
pub use error::Error;
pub use payload::{AddressInfo, AddressKind, Branch, Payload, Trace};
pub use sync::Synchronization;

/// Message type tag of trace packets
pub(crate) const MSG_TRACE: u8 = 2;
/// Message type tag of timer packets
pub(crate) const MSG_TIMER: u8 = 1;
/// Message type tag of software packets
pub(crate) const MSG_SOFTWARE: u8 = 3;

/// Format tag of branch packets carrying an absolute address
pub(crate) const FMT_BRANCH_FULL: u8 = 0;
/// Format tag of branch packets carrying a differential address
pub(crate) const FMT_BRANCH_DIFF: u8 = 1;
/// Format tag of address-only packets
pub(crate) const FMT_ADDR_ONLY: u8 = 2;
/// Format tag of synchronization packets
pub(crate) const FMT_SYNC: u8 = 3;

/// Subformat tag of start synchronization packets
pub(crate) const SF_START: u8 = 0;
/// Subformat tag of exception synchronization packets
pub(crate) const SF_EXCEPTION: u8 = 1;
/// Subformat tag of the reserved context synchronization packets
pub(crate) const SF_CONTEXT: u8 = 2;
