// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::branch::Map;
use super::*;

#[test]
fn branch_map_records_inverted_bits() {
    let mut map = Map::default();
    map.push_taken(true);
    map.push_taken(false);
    map.push_taken(false);
    map.push_taken(true);
    assert_eq!(map.count(), 4);
    assert_eq!(map.raw_bits(), 0b0110);
}

#[test]
fn branch_map_pop_yields_oldest_first() {
    let mut map = Map::new(3, 0b010);
    assert_eq!(map.pop_taken(), Some(true));
    assert_eq!(map.pop_taken(), Some(false));
    assert_eq!(map.pop_taken(), Some(true));
    assert_eq!(map.pop_taken(), None);
}

#[test]
fn branch_map_full_at_31() {
    let mut map = Map::default();
    for _ in 0..30 {
        map.push_taken(true);
        assert!(!map.is_full());
    }
    map.push_taken(false);
    assert!(map.is_full());
    assert_eq!(map.raw_bits(), 1 << 30);
}

#[test]
fn branch_map_new_discards_excess_bits() {
    let map = Map::new(3, 0xffff_ffff);
    assert_eq!(map.raw_bits(), 0b111);
    assert_eq!(Map::new(31, 0xffff_ffff).raw_bits(), 0x7fff_ffff);
}

#[test]
fn privilege_is_masked() {
    assert_eq!(Privilege::new(0xb), Privilege::MACHINE);
    assert_eq!(Privilege::default(), Privilege::UNKNOWN);
}

#[test]
fn record_next_iaddr_honors_compression() {
    assert_eq!(Record::retired(0x100, 0, false).next_iaddr(), 0x104);
    assert_eq!(Record::retired(0x100, 0, true).next_iaddr(), 0x102);
}
