// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Branch-trace compression
//!
//! The [`Compressor`] consumes one [`Record`] per cycle and decides whether
//! the reported instruction warrants a packet. The decision at an
//! instruction often depends on its successor (an upcoming exception,
//! privilege change or end of trace), so the compressor pipelines three
//! snapshots of the stream and reports on the middle one.

pub mod error;


pub use error::Error;

use crate::config::Config;
use crate::instruction::{Instruction, is_unsupported_word};
use crate::packet::{AddressInfo, Branch, Payload, sync, util};
use crate::stats::Stats;
use crate::types::{Record, branch, trap};

/// Branch-trace compressor
///
/// Packets lag the input by one instruction: the packet describing the `n`-th
/// record is returned, at the earliest, by the step consuming record `n + 1`.
/// After the final record, [`finish`][Self::finish] flushes the pending
/// instruction.
///
/// # Example
///
/// ```
/// use pulp_trdb::Record;
/// use pulp_trdb::compressor::Compressor;
///
/// let mut compressor = Compressor::new(Default::default());
/// // nop at 0x1000
/// let record = Record::retired(0x1000, 0x0000_0013, false);
/// assert_eq!(compressor.step(&record).unwrap(), None);
/// // the start packet for 0x1000 is emitted while consuming the next record
/// let record = Record::retired(0x1004, 0x0000_0013, false);
/// assert!(compressor.step(&record).unwrap().is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Compressor {
    config: Config,
    last: Snapshot,
    this: Snapshot,
    next: Snapshot,
    branch_map: branch::Map,
    filter: Filter,
    last_iaddr: u64,
    stats: Stats,
}

impl Compressor {
    /// Create a new compressor
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Consume a single [`Record`]
    ///
    /// Returns the packet emitted this cycle, if any. Records with `valid`
    /// unset are pipeline bubbles; they produce no packet and leave the
    /// compressor state untouched.
    pub fn step(&mut self, record: &Record) -> Result<Option<Payload>, Error> {
        if !record.valid {
            return Ok(None);
        }
        let next = Snapshot::derive(record, self.this.privilege(), &self.config);
        self.advance(next)
    }

    /// Flush the instruction still held in the pipeline
    ///
    /// Runs one cycle with an unqualified successor, forcing a flush packet
    /// for the final instruction of the stream. Calling this more than once
    /// is harmless.
    pub fn finish(&mut self) -> Result<Option<Payload>, Error> {
        self.advance(Snapshot::default())
    }

    /// Retrieve the statistics gathered so far
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Retrieve the configuration this compressor operates under
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reset all compression state, keeping the configuration
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    fn advance(&mut self, next: Snapshot) -> Result<Option<Payload>, Error> {
        self.next = next;

        if !self.this.qualified {
            self.shift();
            return Ok(None);
        }

        let record = self.this.record;
        if is_unsupported_word(record.instr) {
            return Err(Error::UnsupportedInstruction {
                word: record.instr,
                iaddr: record.iaddr,
            });
        }

        if let Some(max) = self.config.resync_max {
            let cnt = self.filter.resync_cnt;
            self.filter.resync_cnt += 1;
            if cnt == max.get() {
                self.filter.resync_pend = true;
                self.filter.resync_cnt = 0;
            }
        }

        if self.this.insn.is_branch() {
            self.branch_map.push_taken(self.branch_taken());
        }

        let packet = self.decide()?;

        self.shift();
        self.stats.record_instr(record.compressed);
        if let Some(packet) = packet.as_ref() {
            self.branch_map.clear();
            self.stats.record_packet(packet, &self.config);
            #[cfg(feature = "log")]
            log::debug!("emitted packet: {packet}");
        }
        Ok(packet)
    }

    /// Evaluate the emit decision table for the pipelined instruction
    fn decide(&mut self) -> Result<Option<Payload>, Error> {
        let first_qualified = !self.last.qualified && self.this.qualified;

        if self.last.exception {
            // Report last cycle's trap together with the handler's entry
            // point. The branch map cannot contain the reported instruction's
            // own branch yet, so a not-taken branch is flagged in the packet.
            let packet = self.emit_exception();
            self.this.emitted_exception_sync = true;
            self.filter.resync_pend = false;
            return Ok(Some(packet));
        }

        if self.last.emitted_exception_sync && self.config.pulp_vector_table_packet {
            // The vector table entry is a jump whose destination may change
            // at runtime. This extra packet records the jump target, which is
            // the second instruction of the trap handler.
            self.filter.resync_pend = false;
            return Ok(Some(self.emit_start()));
        }

        if first_qualified
            || self.this.unhalted
            || self.this.privilege_change
            || (self.filter.resync_pend && self.branch_map.is_empty())
        {
            self.filter.resync_pend = false;
            return Ok(Some(self.emit_start()));
        }

        if self.last.unpred_disc {
            return self.emit_flush(true).map(Some);
        }

        if self.filter.resync_pend && !self.branch_map.is_empty() {
            // The map is flushed here; the start packet completing the
            // resynchronization follows in the next cycle.
            return self.emit_flush(false).map(Some);
        }

        if self.next.halt
            || self.next.exception
            || self.next.privilege_change
            || !self.next.qualified
        {
            return self.emit_flush(false).map(Some);
        }

        if self.branch_map.is_full() {
            return Ok(Some(self.emit_full_map()));
        }

        if self.this.context_change {
            return Err(Error::Unimplemented("context change"));
        }

        Ok(None)
    }

    fn emit_exception(&mut self) -> Payload {
        let last = self.last.record;
        let record = self.this.record;
        self.last_iaddr = record.iaddr;
        sync::Synchronization::from(sync::Exception {
            branch: self.untaken_branch_flag(),
            privilege: record.privilege,
            address: record.iaddr,
            info: trap::Info {
                ecause: last.cause,
                interrupt: last.interrupt,
                tval: last.tval,
            },
        })
        .into()
    }

    fn emit_start(&mut self) -> Payload {
        let record = self.this.record;
        self.last_iaddr = record.iaddr;
        sync::Synchronization::from(sync::Start {
            branch: self.untaken_branch_flag(),
            privilege: record.privilege,
            address: record.iaddr,
        })
        .into()
    }

    /// Emit a packet flushing the branch map together with an address
    ///
    /// The address is the reported instruction's own, letting the decoder
    /// walk up to it (and, for a discontinuity in the preceding instruction,
    /// jump to it).
    fn emit_flush(&mut self, is_u_discontinuity: bool) -> Result<Payload, Error> {
        let iaddr = self.this.record.iaddr;

        if self.branch_map.is_empty() {
            let address = if self.config.full_address {
                AddressInfo::absolute(iaddr)
            } else {
                AddressInfo::differential(self.last_iaddr.wrapping_sub(iaddr))
            };
            self.last_iaddr = iaddr;
            return Ok(address.into());
        }

        let full_map_without_address = self.branch_map.is_full() && !is_u_discontinuity;
        let address = if full_map_without_address {
            // The instruction after the 31st branch is not a discontinuity,
            // so no address needs to be recorded. The decoder's anchor is not
            // moved either.
            None
        } else {
            let (kind, value) = util::choose_address(iaddr, self.last_iaddr, &self.config);
            self.last_iaddr = iaddr;
            Some(AddressInfo { kind, address: value })
        };

        Ok(Branch {
            branch_map: self.branch_map.take(),
            address,
        }
        .into())
    }

    fn emit_full_map(&mut self) -> Payload {
        Branch {
            branch_map: self.branch_map.take(),
            address: None,
        }
        .into()
    }

    /// Determine the branch bit for sync packets
    ///
    /// A sync packet can report an instruction that itself is a branch. That
    /// branch will not be part of any branch map, so the packet records
    /// whether it was not taken.
    fn untaken_branch_flag(&self) -> bool {
        self.this.insn.is_branch() && !self.branch_taken()
    }

    /// Determine whether the pipelined instruction's branch was taken
    ///
    /// A branch was taken if the successor's address is not the sequentially
    /// following one.
    fn branch_taken(&self) -> bool {
        self.next.record.iaddr != self.this.record.next_iaddr()
    }

    fn shift(&mut self) {
        self.last = core::mem::replace(&mut self.this, core::mem::take(&mut self.next));
    }
}

/// Filter state bounding the decoder's recovery time
#[derive(Copy, Clone, Debug, Default)]
struct Filter {
    resync_cnt: u64,
    resync_pend: bool,
}

/// One cell of the compressor's sliding window
#[derive(Clone, Debug, Default)]
struct Snapshot {
    qualified: bool,
    exception: bool,
    unpred_disc: bool,
    emitted_exception_sync: bool,
    privilege_change: bool,
    halt: bool,
    unhalted: bool,
    context_change: bool,
    insn: Instruction,
    record: Record,
}

impl Snapshot {
    /// Derive a snapshot from an incoming record
    ///
    /// `prev_privilege` is the privilege level of the preceding cell, against
    /// which a privilege change is detected.
    fn derive(record: &Record, prev_privilege: crate::Privilege, config: &Config) -> Self {
        let insn = Instruction::from_word(record.instr);
        Self {
            qualified: true,
            exception: record.exception,
            unpred_disc: insn.is_unpredictable(config.implicit_ret),
            emitted_exception_sync: false,
            privilege_change: record.privilege != prev_privilege,
            halt: false,
            unhalted: false,
            context_change: false,
            insn,
            record: *record,
        }
    }

    fn privilege(&self) -> crate::Privilege {
        if self.qualified {
            self.record.privilege
        } else {
            crate::Privilege::UNKNOWN
        }
    }
}
