// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Address compression utilities

use crate::config::Config;
use crate::{XLEN, xlen_mask};

use super::payload::AddressKind;

/// Determine the on-wire length of a branch map field
///
/// Returns the smallest representable field length greater than or equal to
/// `branches`. A count of `0` denotes a full map of 31 entries.
pub fn branch_map_len(branches: u8) -> u32 {
    match branches {
        0 => 31,
        1 => 1,
        2..=9 => 9,
        10..=17 => 17,
        18..=25 => 25,
        _ => 31,
    }
}

/// Count the sign-extendable high bits of an [`XLEN`]-wide value
///
/// Returns the length of the maximal run of identical bits at the top of the
/// value, i.e. the number of high bits that can be dropped and restored by
/// sign extension. The result is in `[1, XLEN]`.
pub fn sign_extendable_bits(value: u64) -> u32 {
    let aligned = (value & xlen_mask()) << (u64::BITS - XLEN);
    let normalized = if aligned >> 63 != 0 { !aligned } else { aligned };
    normalized.leading_zeros().min(XLEN)
}

/// Count the sign-extendable high bits of a 32 bit value
///
/// Used for compressing full branch maps, which are 31 bits wide regardless
/// of [`XLEN`].
pub fn sign_extendable_bits32(value: u32) -> u32 {
    let normalized = if value >> 31 != 0 { !value } else { value };
    normalized.leading_zeros()
}

/// Quantize a sign-extension count to byte boundaries
///
/// In PULP sign-extension mode only savings crossing a byte boundary are
/// useful; everything below the next boundary is rounded down.
pub fn quantize_sext(bits: u32) -> u32 {
    match bits {
        0..=8 => 0,
        9..=16 => 9,
        17..=24 => 17,
        _ => 25,
    }
}

/// Number of redundant leading bits of an address under a configuration
pub fn address_lead(value: u64, config: &Config) -> u32 {
    let lead = sign_extendable_bits(value);
    if config.use_pulp_sext {
        quantize_sext(lead)
    } else {
        lead
    }
}

/// Number of address bits kept on the wire under a configuration
///
/// In full address mode the full [`XLEN`] bits are kept. Otherwise the
/// sign-extendable prefix is dropped, keeping `XLEN - lead + 1` bits. With
/// byte-boundary quantization the lead may be zero, in which case one bit
/// more than [`XLEN`] is kept.
pub fn address_keep(value: u64, config: &Config) -> u32 {
    if config.full_address {
        XLEN
    } else {
        XLEN - address_lead(value, config) + 1
    }
}

/// Number of bits kept for a full branch map without address
pub(super) fn full_map_keep(bits: u32, config: &Config) -> u32 {
    if config.compress_full_branch_map {
        let sext = sign_extendable_bits32(bits << 1).min(31);
        31 - sext + 1
    } else {
        31
    }
}

/// Choose between an absolute and a differential address
///
/// Given the current instruction address and the previous packet's address,
/// selects the representation with more redundant high bits. Ties prefer the
/// absolute form. In full address mode the absolute form is always chosen.
pub fn choose_address(iaddr: u64, last_iaddr: u64, config: &Config) -> (AddressKind, u64) {
    if config.full_address {
        return (AddressKind::Absolute, iaddr);
    }

    let diff = last_iaddr.wrapping_sub(iaddr) & xlen_mask();
    let abs_lead = address_lead(iaddr, config);
    let diff_lead = address_lead(diff, config);
    if diff_lead > abs_lead {
        (AddressKind::Differential, diff)
    } else {
        (AddressKind::Absolute, iaddr)
    }
}
