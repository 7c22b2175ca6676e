// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Basic [`Binary`]s and adapters

use crate::instruction::{Bits, Instruction};

use super::Binary;
use super::error::{self, SegmentError};

/// A contiguous range of program bytes mapped at a virtual address
///
/// This is the unit the tracer's walk operates on: a section or segment of
/// the traced program, loaded as little-endian bytes starting at `vma`.
#[derive(Copy, Clone, Debug)]
pub struct Segment<'d> {
    vma: u64,
    data: &'d [u8],
}

impl<'d> Segment<'d> {
    /// Create a new segment mapping `data` at `vma`
    pub fn new(vma: u64, data: &'d [u8]) -> Self {
        Self { vma, data }
    }

    /// Retrieve the first address covered by this segment
    pub fn first_addr(&self) -> u64 {
        self.vma
    }

    /// Retrieve the first address past this segment
    pub fn end_addr(&self) -> u64 {
        self.vma.saturating_add(self.data.len() as u64)
    }

    /// Determine whether this segment covers the given address
    pub fn contains(&self, address: u64) -> bool {
        address >= self.vma && address < self.end_addr()
    }
}

impl Binary for Segment<'_> {
    type Error = SegmentError;

    fn get_insn(&mut self, address: u64) -> Result<Instruction, Self::Error> {
        let offset = address
            .checked_sub(self.vma)
            .ok_or(SegmentError::AddressNotCovered)?;
        let offset: usize = offset
            .try_into()
            .map_err(SegmentError::ExceededHostUSize)?;
        let data = self
            .data
            .get(offset..)
            .filter(|d| !d.is_empty())
            .ok_or(SegmentError::AddressNotCovered)?;
        Bits::extract(data)
            .map(|(b, _)| b.into())
            .ok_or(SegmentError::InvalidInstruction)
    }
}

/// [`Binary`] adapter for an [`FnMut`]
///
/// This forwards calls to [`Binary::get_insn`] to the wrapped [`FnMut`].
#[derive(Copy, Clone, Default, Debug)]
pub struct Func<F: FnMut(u64) -> Result<Instruction, E>, E> {
    func: F,
    phantom: core::marker::PhantomData<E>,
}

impl<F: FnMut(u64) -> Result<Instruction, E>, E> Binary for Func<F, E> {
    type Error = E;

    fn get_insn(&mut self, address: u64) -> Result<Instruction, Self::Error> {
        (self.func)(address)
    }
}

/// Create a [`Func`] [`Binary`] from an [`FnMut`]
pub fn from_fn<F: FnMut(u64) -> Result<Instruction, E>, E>(func: F) -> Func<F, E> {
    Func {
        func,
        phantom: Default::default(),
    }
}

/// A [`Binary`] that does not contain any [`Instruction`]s
#[derive(Copy, Clone, Default, Debug)]
pub struct Empty;

impl Binary for Empty {
    type Error = error::NoInstruction;

    fn get_insn(&mut self, _: u64) -> Result<Instruction, Self::Error> {
        Err(error::NoInstruction)
    }
}
