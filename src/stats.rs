// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Compression statistics

use crate::config::Config;
use crate::packet::{AddressKind, Payload, Synchronization, Trace, util};
use crate::{XLEN, xlen_mask};

/// Number of bins in the kept-width histogram
///
/// Kept address widths range over `1..=XLEN + 1`: with byte-boundary
/// quantization a lead of zero keeps one bit more than [`XLEN`].
pub const SEXT_BINS: usize = XLEN as usize + 1;

/// Counters describing a compression run
///
/// One [`Stats`] value is owned by each
/// [`Compressor`][crate::compressor::Compressor]. All counters are plain
/// fields and may be inspected at any time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stats {
    /// Total number of packets emitted
    pub packets: u64,
    /// Total payload bits over all packets, excluding wire framing
    pub payload_bits: u64,
    /// Total bits on the wire, including framing, rounded to full bytes
    pub pulp_bits: u64,
    /// Number of instructions consumed
    pub instrs: u64,
    /// Total bits of consumed instructions
    pub instr_bits: u64,
    /// Start synchronization packets
    pub start_packets: u64,
    /// Exception synchronization packets
    pub exception_packets: u64,
    /// Address-only packets
    pub addr_only_packets: u64,
    /// Branch packets carrying a differential address
    pub diff_packets: u64,
    /// Branch packets carrying an absolute address
    pub abs_packets: u64,
    /// Full-branch-map packets without address
    pub bmap_full_packets: u64,
    /// Full-branch-map packets carrying an address
    pub bmap_full_addr_packets: u64,
    /// Addresses that were all zeroes or all ones
    pub zo_addresses: u64,
    /// Full branch maps that were all zeroes or all ones
    pub zo_branchmaps: u64,
    /// Histogram of kept address widths
    ///
    /// Bin `i` counts packets whose address kept `i + 1` bits on the wire.
    /// The final bin holds the `XLEN + 1` widths produced by a quantized
    /// lead of zero in PULP sign-extension mode.
    pub sext_bits: [u64; SEXT_BINS],
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            packets: 0,
            payload_bits: 0,
            pulp_bits: 0,
            instrs: 0,
            instr_bits: 0,
            start_packets: 0,
            exception_packets: 0,
            addr_only_packets: 0,
            diff_packets: 0,
            abs_packets: 0,
            bmap_full_packets: 0,
            bmap_full_addr_packets: 0,
            zo_addresses: 0,
            zo_branchmaps: 0,
            sext_bits: [0; SEXT_BINS],
        }
    }
}

impl Stats {
    /// Record a consumed instruction
    pub(crate) fn record_instr(&mut self, compressed: bool) {
        self.instrs += 1;
        self.instr_bits += if compressed { 16 } else { 32 };
    }

    /// Record an emitted packet
    pub(crate) fn record_packet(&mut self, packet: &Payload, config: &Config) {
        self.packets += 1;
        if let Ok(bits) = packet.payload_bits(config) {
            self.payload_bits += u64::from(bits);
        }
        if let Ok(bits) = packet.framed_bits(config) {
            self.pulp_bits += u64::from(bits);
        }

        let Some(trace) = packet.as_trace() else {
            return;
        };
        match trace {
            Trace::Sync(Synchronization::Start(_)) => self.start_packets += 1,
            Trace::Sync(Synchronization::Exception(_)) => self.exception_packets += 1,
            Trace::Sync(Synchronization::Context) => (),
            Trace::Address(addr) => {
                self.addr_only_packets += 1;
                self.record_address(addr.address, config);
            }
            Trace::Branch(branch) => match branch.address.as_ref() {
                Some(addr) => {
                    if branch.branch_map.is_full() {
                        self.bmap_full_addr_packets += 1;
                    } else {
                        match addr.kind {
                            AddressKind::Absolute => self.abs_packets += 1,
                            AddressKind::Differential => self.diff_packets += 1,
                        }
                    }
                    self.record_address(addr.address, config);
                }
                None => {
                    self.bmap_full_packets += 1;
                    let bits = branch.branch_map.raw_bits();
                    if bits == 0 || bits == 0x7fff_ffff {
                        self.zo_branchmaps += 1;
                    }
                }
            },
        }
    }

    /// Average payload bits per consumed instruction
    pub fn bits_per_instr(&self) -> f64 {
        if self.instrs == 0 {
            return 0.0;
        }
        self.payload_bits as f64 / self.instrs as f64
    }

    fn record_address(&mut self, address: u64, config: &Config) {
        if config.full_address {
            return;
        }
        let keep = util::address_keep(address, config);
        self.sext_bits[(keep - 1) as usize] += 1;
        if address == 0 || address == xlen_mask() {
            self.zo_addresses += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::packet::AddressInfo;

    #[test]
    fn quantized_lead_of_zero_lands_in_the_last_bin() {
        let config = Config {
            full_address: false,
            use_pulp_sext: true,
            ..Default::default()
        };
        // only 8 sign-extendable bits, which quantize to a lead of zero
        let address = 1u64 << (XLEN - 9);
        assert_eq!(util::address_keep(address, &config), XLEN + 1);

        let mut stats = Stats::default();
        stats.record_packet(&AddressInfo::differential(address).into(), &config);
        assert_eq!(stats.sext_bits[SEXT_BINS - 1], 1);
    }

    #[test]
    fn unquantized_widths_stay_within_xlen() {
        let config = Config {
            full_address: false,
            ..Default::default()
        };
        let keep = util::address_keep(0x40, &config);
        assert!(keep <= XLEN);

        let mut stats = Stats::default();
        stats.record_packet(&AddressInfo::differential(0x40).into(), &config);
        stats.record_packet(&AddressInfo::differential(0).into(), &config);
        assert_eq!(stats.sext_bits[(keep - 1) as usize], 1);
        // an all-zero difference keeps a single bit
        assert_eq!(stats.sext_bits[0], 1);
        assert_eq!(stats.zo_addresses, 1);
        assert_eq!(stats.sext_bits[SEXT_BINS - 1], 0);
    }
}
