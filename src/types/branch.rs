// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Branch map utilities

/// A record of branches that are taken or not taken
///
/// Bit `i` of the map corresponds to the `i`-th recorded branch; a set bit
/// means the branch was *not* taken. A map holds at most
/// [`MAX_BRANCHES`][Self::MAX_BRANCHES] entries.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct Map {
    bits: u32,
    count: u8,
}

impl Map {
    /// Maximum number of branches a branch map can hold
    pub const MAX_BRANCHES: u8 = 31;

    /// Create a branch map from a raw bit vector
    ///
    /// Bits at positions `count` and above are discarded.
    pub fn new(count: u8, bits: u32) -> Self {
        let count = count.min(Self::MAX_BRANCHES);
        let mask = 1u32
            .checked_shl(count.into())
            .map(|b| b - 1)
            .unwrap_or(u32::MAX);
        Self {
            bits: bits & mask,
            count,
        }
    }

    /// Append a new branch decision
    ///
    /// Appending to a full map is a no-op.
    pub fn push_taken(&mut self, taken: bool) {
        if self.count >= Self::MAX_BRANCHES {
            debug_assert!(false, "branch map overflow");
            return;
        }
        if !taken {
            self.bits |= 1 << self.count;
        }
        self.count += 1;
    }

    /// Remove the oldest branch decision and return whether it was taken
    pub fn pop_taken(&mut self) -> Option<bool> {
        let count = self.count.checked_sub(1)?;
        let taken = self.bits & 1 == 0;
        self.bits >>= 1;
        self.count = count;
        Some(taken)
    }

    /// Retrieve the number of branches in the map
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Determine whether the map holds the maximum number of entries
    pub fn is_full(&self) -> bool {
        self.count == Self::MAX_BRANCHES
    }

    /// Determine whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Retrieve the raw contents of the map
    ///
    /// The lowest valued bit corresponds to the oldest branch. Set bits
    /// represent branches not taken, unset bits represent taken branches.
    pub fn raw_bits(&self) -> u32 {
        self.bits
    }

    /// Reset the map to the empty state
    pub fn clear(&mut self) {
        *self = Default::default();
    }

    /// Take the current contents, leaving the map empty
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

impl core::fmt::Display for Map {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} branches, map {:b}", self.count, self.bits)
    }
}
