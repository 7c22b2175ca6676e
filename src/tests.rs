// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Cross-module round trip tests

use std::vec::Vec;

use crate::binary::{Multi, Segment};
use crate::compressor::Compressor;
use crate::config::Config;
use crate::packet::{Decoder, Encoder, Payload};
use crate::tracer::Tracer;
use crate::types::Record;

// 0x1000: nop
// 0x1004: beq a0, a1, +8     (not taken in the traced run)
// 0x1008: jal ra, +24        (call to 0x1020)
// 0x100c: nop
// 0x1010: nop
// 0x1014: nop
// 0x1018: nop
// 0x101c: nop
// 0x1020: nop                (function body)
// 0x1024: ret
const TEXT: &[u8] = b"\x13\x00\x00\x00\x63\x04\xb5\x00\xef\x00\x80\x01\x13\x00\x00\x00\
                      \x13\x00\x00\x00\x13\x00\x00\x00\x13\x00\x00\x00\x13\x00\x00\x00\
                      \x13\x00\x00\x00\x67\x80\x00\x00";

/// The retired-instruction stream of one run over [`TEXT`]
fn traced_run() -> Vec<Record> {
    [
        (0x1000, 0x0000_0013),
        (0x1004, 0x00b5_0463),
        (0x1008, 0x0180_00ef),
        (0x1020, 0x0000_0013),
        (0x1024, 0x0000_8067),
        (0x100c, 0x0000_0013),
        (0x1010, 0x0000_0013),
    ]
    .into_iter()
    .map(|(iaddr, instr)| Record::retired(iaddr, instr, false))
    .collect()
}

fn compress(records: &[Record], config: Config) -> Vec<Payload> {
    let mut compressor = Compressor::new(config);
    let mut packets: Vec<_> = records
        .iter()
        .filter_map(|r| compressor.step(r).unwrap())
        .collect();
    packets.extend(compressor.finish().unwrap());
    packets
}

fn reconstruct(packets: &[Payload], config: Config) -> Vec<u64> {
    let mut tracer: Tracer<_> = Tracer::new(Segment::new(0x1000, TEXT), config);
    let mut pcs = Vec::new();
    for packet in packets {
        tracer.process_packet(packet).unwrap();
        for item in tracer.by_ref() {
            pcs.push(item.unwrap().pc());
        }
    }
    pcs
}

fn assert_roundtrip(config: Config) {
    let records = traced_run();
    let packets = compress(&records, config);
    let pcs = reconstruct(&packets, config);
    let expected: Vec<_> = records.iter().map(|r| r.iaddr).collect();
    assert_eq!(pcs, expected, "packets: {packets:?}");
}

#[test]
fn roundtrip_full_address() {
    assert_roundtrip(Default::default());
}

#[test]
fn roundtrip_delta_address() {
    assert_roundtrip(Config {
        full_address: false,
        ..Default::default()
    });
}

#[test]
fn roundtrip_delta_pulp_sext() {
    assert_roundtrip(Config {
        full_address: false,
        use_pulp_sext: true,
        ..Default::default()
    });
}

#[test]
fn roundtrip_implicit_ret() {
    assert_roundtrip(Config {
        implicit_ret: true,
        ..Default::default()
    });
}

#[test]
fn roundtrip_over_the_wire() {
    for config in [
        Config::default(),
        Config {
            full_address: false,
            ..Default::default()
        },
    ] {
        let records = traced_run();
        let packets = compress(&records, config);

        let mut encoder = Encoder::new([0u8; 128], config);
        for packet in &packets {
            encoder.encode_packet(packet).unwrap();
        }
        let (buf, len) = encoder.finish();

        let mut decoder = Decoder::new(&buf[..len], config);
        let mut decoded = Vec::new();
        while !decoder.only_padding_left() {
            decoded.push(decoder.decode_packet().unwrap());
        }
        assert_eq!(decoded, packets);

        let pcs = reconstruct(&decoded, config);
        let expected: Vec<_> = records.iter().map(|r| r.iaddr).collect();
        assert_eq!(pcs, expected);
    }
}

/// Call and return with implicit returns: a single start packet suffices
#[test]
fn implicit_ret_needs_a_single_packet() {
    // 0x1000: jal ra, +0x1000 (call to 0x2000)
    let caller: &[u8] = b"\xef\x10\x00\x00";
    // 0x2000: nop; 0x2004: ret
    let callee: &[u8] = b"\x13\x00\x00\x00\x67\x80\x00\x00";
    let jal = 0x0000_10ef;

    let records = [
        Record::retired(0x1000, jal, false),
        Record::retired(0x2000, 0x0000_0013, false),
        Record::retired(0x2004, 0x0000_8067, false),
    ];

    let config = Config {
        implicit_ret: true,
        ..Default::default()
    };
    let mut compressor = Compressor::new(config);
    let packets: Vec<_> = records
        .iter()
        .filter_map(|r| compressor.step(r).unwrap())
        .collect();
    assert_eq!(packets.len(), 1);

    let segments = [Segment::new(0x1000, caller), Segment::new(0x2000, callee)];
    let mut tracer: Tracer<_> = Tracer::new(Multi::new(segments), config);
    let mut pcs = Vec::new();
    for packet in &packets {
        tracer.process_packet(packet).unwrap();
        for item in tracer.by_ref() {
            pcs.push(item.unwrap().pc());
        }
    }
    for item in tracer.drain().unwrap() {
        pcs.push(item.unwrap().pc());
    }

    assert_eq!(pcs, [0x1000, 0x2000, 0x2004]);
    assert_eq!(tracer.stack_depth(), 0);
}
