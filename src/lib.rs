// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

//! # Compressor and decompressor for PULP RISC-V branch traces
//!
//! This crate implements the branch-trace compression scheme of the PULP
//! trace debugger. A hardware trace unit emits one [`Record`] per retired
//! instruction; the [`compressor`] condenses that stream into a sequence of
//! trace [`packet`]s whose size is close to the information-theoretic
//! minimum of roughly one bit per conditional branch plus one address per
//! unpredictable control-flow discontinuity. The [`tracer`] reconstructs the
//! original instruction sequence from the packet stream and the program
//! [`binary`], consuming packet data only where static disassembly cannot
//! predict control flow.
//!
//! # Features
//! - delta/full address mode with sign-extension based address compression
//! - optional PULP byte-boundary quantization of sign extension
//! - optional implicit return mode backed by a return address stack
//! - optional synthetic start packet covering the PULP vector table jump
//! - bit-granular packet framing with a 4-bit length prefix
//!
//! # no_std
//! The core is free of the standard library. The `alloc` feature enables
//! growable return stacks, `std` additionally enables the stream adapters
//! in [`io`], and `elf` enables the ELF-backed [`binary`].
//!
//! # Example
//!
//! The following example compresses a short instruction sequence and
//! reconstructs it from the generated packets.
//!
//! ```
//! use pulp_trdb::Record;
//! use pulp_trdb::binary::Segment;
//! use pulp_trdb::compressor::Compressor;
//! use pulp_trdb::tracer::Tracer;
//!
//! // three nops
//! let text = b"\x13\x00\x00\x00\x13\x00\x00\x00\x13\x00\x00\x00";
//! let records = [
//!     Record::retired(0x1000, 0x13, false),
//!     Record::retired(0x1004, 0x13, false),
//!     Record::retired(0x1008, 0x13, false),
//! ];
//!
//! let config = Default::default();
//! let mut compressor = Compressor::new(config);
//! let mut packets = Vec::new();
//! for record in &records {
//!     packets.extend(compressor.step(record).unwrap());
//! }
//! packets.extend(compressor.finish().unwrap());
//!
//! let mut tracer: Tracer<_> = Tracer::new(Segment::new(0x1000, text), config);
//! let mut pcs = Vec::new();
//! for packet in &packets {
//!     tracer.process_packet(packet).unwrap();
//!     tracer.by_ref().for_each(|i| pcs.push(i.unwrap().pc()));
//! }
//! assert_eq!(pcs, [0x1000, 0x1004, 0x1008]);
//! ```
#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

pub mod binary;
pub mod compressor;
pub mod config;
pub mod instruction;
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod io;
pub mod packet;
pub mod stats;
pub mod tracer;
pub mod types;

#[cfg(test)]
mod tests;

pub use instruction::Instruction;
pub use types::{Privilege, Record};

/// Native register width of the traced core
#[cfg(feature = "arch64")]
pub const XLEN: u32 = 64;
/// Native register width of the traced core
#[cfg(not(feature = "arch64"))]
pub const XLEN: u32 = 32;

/// Width of the privilege field in sync payloads
pub const PRIVLEN: u32 = 3;
/// Width of the (reserved) context field in sync payloads
pub const CONTEXTLEN: u32 = 2;
/// Width of the exception cause field
pub const CAUSELEN: u32 = 5;
/// Width of the branch count field
pub const BRANCHLEN: u32 = 5;
/// Width of the packet format and subformat fields
pub const FORMATLEN: u32 = 2;
/// Width of the message type field
pub const MSGTYPELEN: u32 = 2;
/// Width of the framing length prefix
pub const PULPPKTLEN: u32 = 4;
/// Width of the timer payload
pub const TIMELEN: u32 = 40;

/// Bit mask covering the low [`XLEN`] bits
pub const fn xlen_mask() -> u64 {
    if XLEN >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << XLEN) - 1
    }
}

/// Truncate a value to [`XLEN`] bits
pub const fn truncate_addr(addr: u64) -> u64 {
    addr & xlen_mask()
}
