// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Branch-trace reconstruction
//!
//! The [`Tracer`] consumes trace packets in order and walks the program
//! [`Binary`] alongside them, statically disassembling each instruction to
//! predict control flow and consuming packet information only where
//! prediction fails: one branch map bit per conditional branch and one
//! address per unpredictable discontinuity.
//!
//! After [processing][Tracer::process_packet] a packet, the tracer yields the
//! reconstructed [`Item`]s as an [`Iterator`]. A packet's items must be
//! exhausted before the next packet is processed.

pub mod error;
pub mod item;
pub mod stack;


pub use error::Error;
pub use item::Item;
pub use stack::ReturnStack;

use crate::binary::Binary;
use crate::config::Config;
use crate::instruction::{Class, Instruction};
use crate::packet::{Payload, Synchronization, Trace};
use crate::types::{Privilege, branch};
use crate::xlen_mask;

/// Branch-trace decompressor
///
/// Reconstructs the traced instruction sequence from a packet stream and the
/// program binary. See the [crate documentation][crate] for a usage example.
#[derive(Clone, Debug)]
pub struct Tracer<B, S = stack::DefaultStack> {
    binary: B,
    config: Config,
    pc: u64,
    privilege: Privilege,
    last_packet_addr: u64,
    branch_map: branch::Map,
    ras: S,
    walk: Walk,
    started: bool,
    after_exception: bool,
}

impl<B: Binary, S: ReturnStack> Tracer<B, S> {
    /// Create a new tracer walking the given binary
    pub fn new(binary: B, config: Config) -> Self {
        Self {
            binary,
            config,
            pc: 0,
            privilege: Default::default(),
            last_packet_addr: 0,
            branch_map: Default::default(),
            ras: Default::default(),
            walk: Walk::Idle,
            started: false,
            after_exception: false,
        }
    }

    /// Retrieve the current return address stack depth
    pub fn stack_depth(&self) -> usize {
        self.ras.depth()
    }

    /// Retrieve the current privilege level
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// Process a single packet
    ///
    /// Prepares the tracer to yield the instructions covered by the packet.
    /// Software and timer packets carry no trace information and are skipped.
    /// Fails with [`Error::UnprocessedItems`] if the previous packet's items
    /// have not been exhausted.
    pub fn process_packet(&mut self, packet: &Payload) -> Result<(), Error<B::Error>> {
        if !matches!(self.walk, Walk::Idle) {
            return Err(Error::UnprocessedItems);
        }

        #[cfg(feature = "log")]
        log::debug!("processing packet: {packet}");

        let Some(trace) = packet.as_trace() else {
            return Ok(());
        };

        match trace {
            Trace::Sync(sync) => self.process_sync(sync),
            Trace::Branch(b) => {
                if !self.started {
                    return Err(Error::StartOfTrace);
                }
                let address = b
                    .address
                    .as_ref()
                    .map(|a| a.resolve(self.last_packet_addr))
                    .unwrap_or(0);
                if b.address.is_some() {
                    self.last_packet_addr = address;
                }
                self.branch_map = b.branch_map;
                self.start_walk(address, b.branch_map.is_full());
                Ok(())
            }
            Trace::Address(a) => {
                if !self.started {
                    return Err(Error::StartOfTrace);
                }
                let address = a.resolve(self.last_packet_addr);
                self.last_packet_addr = address;
                self.start_walk(address, false);
                Ok(())
            }
        }
    }

    /// Switch to drain mode
    ///
    /// After the final packet, the statically inferable tail of the program
    /// can still be walked: the tracer keeps yielding items until it reaches
    /// a point that would require packet information (a conditional branch,
    /// an unpredictable discontinuity, an unmatched return) or leaves the
    /// binary.
    pub fn drain(&mut self) -> Result<&mut Self, Error<B::Error>> {
        if !matches!(self.walk, Walk::Idle) {
            return Err(Error::UnprocessedItems);
        }
        if self.started {
            self.walk = Walk::Drain;
        }
        Ok(self)
    }

    /// Determine the next reconstructed item
    ///
    /// Returns [`None`] when the information of the current packet is used
    /// up.
    pub fn next_item(&mut self) -> Result<Option<Item>, Error<B::Error>> {
        let res = match self.walk {
            Walk::Idle => return Ok(None),
            Walk::Sync {
                branch_not_taken,
                exception,
            } => {
                self.walk = Walk::Idle;
                self.step_sync(branch_not_taken, exception).map(Some)
            }
            Walk::Packet {
                address,
                hit_address,
                hit_discontinuity,
            } => {
                if self.branch_map.is_empty() && (hit_address || hit_discontinuity) {
                    self.walk = Walk::Idle;
                    return Ok(None);
                }
                self.step_packet(address, hit_address, hit_discontinuity)
                    .map(Some)
            }
            Walk::Drain => return self.step_drain(),
        };

        if res.is_err() {
            self.walk = Walk::Idle;
        }
        res
    }

    fn process_sync(&mut self, sync: &Synchronization) -> Result<(), Error<B::Error>> {
        let (Some(address), Some(privilege), Some(branch)) =
            (sync.address(), sync.privilege(), sync.branch())
        else {
            return Err(Error::UnsupportedPacket);
        };

        self.privilege = privilege;
        self.pc = address;
        self.last_packet_addr = address;
        self.branch_map.clear();
        self.started = true;
        self.after_exception = false;
        self.walk = Walk::Sync {
            branch_not_taken: branch,
            exception: matches!(sync, Synchronization::Exception(_)),
        };
        Ok(())
    }

    /// Begin walking towards the given address
    ///
    /// If the preceding packet reported an exception whose instruction could
    /// not be followed, this packet carries the target of the vector table
    /// jump; the walk resumes there.
    fn start_walk(&mut self, address: u64, map_full: bool) {
        if core::mem::take(&mut self.after_exception) {
            self.pc = address;
        }
        self.walk = Walk::Packet {
            address,
            hit_address: false,
            hit_discontinuity: map_full,
        };
    }

    /// Reconstruct the single instruction reported by a sync packet
    fn step_sync(
        &mut self,
        branch_not_taken: bool,
        exception: bool,
    ) -> Result<Item, Error<B::Error>> {
        let pc = self.pc;
        let insn = self.get_insn(pc)?;
        let ret_target = self.bookkeep_ras(&insn, pc)?;

        let next = if let Some(target) = branch_target(&insn, pc) {
            if branch_not_taken {
                insn.link_address(pc)
            } else {
                target
            }
        } else if let Some(target) = ret_target {
            target
        } else if let Some(target) = inferable_target(&insn, pc) {
            target
        } else if insn.is_unpredictable(self.config.implicit_ret) {
            // The target is unknown; the next packet provides it. For an
            // exception this is the runtime-variable vector table jump.
            if exception {
                self.after_exception = true;
            }
            insn.link_address(pc)
        } else {
            insn.link_address(pc)
        };

        self.pc = next;
        Ok(Item::new(pc, insn, self.privilege))
    }

    /// Advance one instruction within a branch or address packet's walk
    fn step_packet(
        &mut self,
        address: u64,
        mut hit_address: bool,
        mut hit_discontinuity: bool,
    ) -> Result<Item, Error<B::Error>> {
        let pc = self.pc;
        let insn = self.get_insn(pc)?;
        let ret_target = self.bookkeep_ras(&insn, pc)?;

        let next = if let Some(target) = branch_target(&insn, pc) {
            let taken = self
                .branch_map
                .pop_taken()
                .ok_or(Error::UnresolvableBranch)?;
            if taken {
                target
            } else {
                insn.link_address(pc)
            }
        } else if let Some(target) = ret_target {
            target
        } else if let Some(target) = inferable_target(&insn, pc) {
            target
        } else if insn.is_unpredictable(self.config.implicit_ret) {
            // The packet's address is this jump's target. A single branch may
            // remain in the map: the reported instruction itself can be a
            // branch whose decision was recorded in the same cycle.
            if self.branch_map.count() > 1 {
                return Err(Error::UnexpectedDiscontinuity);
            }
            hit_discontinuity = true;
            address
        } else {
            insn.link_address(pc)
        };

        if self.branch_map.is_empty() && pc == address {
            hit_address = true;
        }

        self.pc = next;
        self.walk = Walk::Packet {
            address,
            hit_address,
            hit_discontinuity,
        };
        Ok(Item::new(pc, insn, self.privilege))
    }

    /// Advance one instruction in drain mode
    ///
    /// Stops, without an error, at the first instruction whose successor
    /// would require packet information, or when leaving the binary.
    fn step_drain(&mut self) -> Result<Option<Item>, Error<B::Error>> {
        let pc = self.pc;
        let Ok(insn) = self.get_insn(pc) else {
            self.walk = Walk::Idle;
            return Ok(None);
        };

        let implicit = self.config.implicit_ret;
        let next = if insn.is_branch() || insn.is_unpredictable(implicit) {
            None
        } else if implicit && insn.classify() == Class::Ret {
            self.ras.pop()
        } else {
            inferable_target(&insn, pc).or_else(|| Some(insn.link_address(pc)))
        };

        let Some(next) = next else {
            self.walk = Walk::Idle;
            return Ok(None);
        };

        if implicit && insn.classify() == Class::Call {
            self.ras.push(insn.link_address(pc));
        }

        self.pc = next;
        Ok(Some(Item::new(pc, insn, self.privilege)))
    }

    /// Maintain the return address stack for one instruction
    ///
    /// Calls push their link address, returns pop, and a co-routine return
    /// pops and pushes at once. Returns the popped address for plain
    /// returns. The stack is only maintained in implicit return mode; in
    /// explicit mode return targets come from packets.
    fn bookkeep_ras(&mut self, insn: &Instruction, pc: u64) -> Result<Option<u64>, Error<B::Error>> {
        if !self.config.implicit_ret {
            return Ok(None);
        }

        match insn.classify() {
            Class::Call => {
                self.ras.push(insn.link_address(pc));
                Ok(None)
            }
            Class::Ret => self
                .ras
                .pop()
                .ok_or(Error::ReturnStackEmpty)
                .map(Some),
            Class::CoRet => {
                self.ras.pop().ok_or(Error::ReturnStackEmpty)?;
                self.ras.push(insn.link_address(pc));
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn get_insn(&mut self, address: u64) -> Result<Instruction, Error<B::Error>> {
        self.binary
            .get_insn(address)
            .map_err(|e| Error::CannotGetInstruction(e, address))
    }
}

impl<B: Binary, S: ReturnStack> Iterator for Tracer<B, S> {
    type Item = Result<Item, Error<B::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

/// Walk state of the current packet
#[derive(Copy, Clone, Debug)]
enum Walk {
    /// No packet information left to apply
    Idle,
    /// Report the single instruction of a sync packet
    Sync {
        branch_not_taken: bool,
        exception: bool,
    },
    /// Walk consuming branch bits until the packet's information is used up
    Packet {
        address: u64,
        hit_address: bool,
        hit_discontinuity: bool,
    },
    /// Walk the statically inferable tail after the final packet
    Drain,
}

/// Absolute target of a conditional branch
fn branch_target(insn: &Instruction, pc: u64) -> Option<u64> {
    let imm = insn.kind.and_then(|k| k.branch_target())?;
    Some(pc.wrapping_add_signed(imm.into()) & xlen_mask())
}

/// Absolute target of an inferable jump
fn inferable_target(insn: &Instruction, pc: u64) -> Option<u64> {
    let imm = insn.kind.and_then(|k| k.inferable_jump_target())?;
    Some(pc.wrapping_add_signed(imm.into()) & xlen_mask())
}
