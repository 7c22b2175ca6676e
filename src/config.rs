// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Configuration and utilities

#[cfg(feature = "serde")]
mod serde_utils;

use core::fmt;
use core::num::NonZeroU64;

/// Compression and decompression settings
///
/// A [`Config`] is owned by each [`Compressor`][crate::compressor::Compressor]
/// and [`Tracer`][crate::tracer::Tracer]. Both sides of a trace link must
/// agree on all settings for reconstruction to succeed.
///
/// # Serde
///
/// If the `serde` feature is enabled, this type supports (de)serialization.
/// Boolean flags are (de)serialized to/from the numerical values `0` and `1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Always emit absolute addresses
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub full_address: bool,
    /// Quantize sign-extension savings to byte boundaries
    ///
    /// Only relevant if [`full_address`][Self::full_address] is `false`.
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub use_pulp_sext: bool,
    /// Let the decoder's return address stack predict `ret` targets
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub implicit_ret: bool,
    /// Emit a synthetic start packet after each exception sync packet
    ///
    /// The PULP vector table entry is a jump whose destination may change at
    /// runtime. The extra packet records the jump target, which is the second
    /// instruction of the trap handler.
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub pulp_vector_table_packet: bool,
    /// Strip redundant high bits of full branch maps without address
    #[cfg_attr(feature = "serde", serde(with = "serde_utils::Flag"))]
    pub compress_full_branch_map: bool,
    /// Largest number of instructions between forced resynchronizations
    ///
    /// [`None`] disables forced resynchronization.
    pub resync_max: Option<NonZeroU64>,
}

/// See [`CONFIG`] for default values of individual fields
impl Default for Config {
    fn default() -> Self {
        CONFIG
    }
}

/// Default [`Config`]
pub const CONFIG: Config = Config {
    full_address: true,
    use_pulp_sext: false,
    implicit_ret: false,
    pulp_vector_table_packet: true,
    compress_full_branch_map: false,
    resync_max: None,
};

impl Config {
    /// Retrieve the [`AddressMode`] implied by this configuration
    pub const fn address_mode(&self) -> AddressMode {
        AddressMode::from_full(self.full_address)
    }
}

/// Address mode
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub enum AddressMode {
    /// Any address is assumed to be a full, absolute address
    #[default]
    Full,
    /// An address may be relative to the previous packet's address
    Delta,
}

impl AddressMode {
    /// Create an address mode from a [`bool`] indicating full address mode
    pub const fn from_full(full: bool) -> Self {
        if full { Self::Full } else { Self::Delta }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Delta => write!(f, "delta"),
        }
    }
}
