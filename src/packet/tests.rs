// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0

use super::*;

use crate::config::Config;
use crate::types::{Privilege, branch, trap};

fn delta() -> Config {
    Config {
        full_address: false,
        ..Default::default()
    }
}

fn payload_bytes(packet: &Payload, config: &Config) -> ([u8; 16], usize) {
    let mut encoder = Encoder::new([0u8; 16], *config);
    encoder.encode_payload(packet).unwrap();
    let bits = encoder.bit_count();
    let (buf, _) = encoder.finish();
    (buf, bits)
}

macro_rules! payload_vector_test {
    ($n:ident, $p:expr, $e:literal) => {
        #[test]
        fn $n() {
            let packet = Payload::from($p);
            let (buf, bits) = payload_bytes(&packet, &Default::default());
            let expected: &[u8] = $e;
            assert_eq!(bits.div_ceil(8), expected.len());
            assert_eq!(&buf[..expected.len()], expected);
        }
    };
}

// Reference bit images of the PULP trace debugger
payload_vector_test!(
    serialize_sync_start,
    sync::Synchronization::from(sync::Start {
        branch: true,
        privilege: Privilege::MACHINE,
        address: 0xdead_beef,
    }),
    b"\xce\xf8\xee\xdb\xea\x0d"
);
payload_vector_test!(
    serialize_sync_exception,
    sync::Synchronization::from(sync::Exception {
        branch: true,
        privilege: Privilege::MACHINE,
        address: 0xdead_beef,
        info: trap::Info {
            ecause: 0x1a,
            interrupt: true,
            tval: 0xfeeb_deed,
        },
    }),
    b"\xde\xf8\xee\xdb\xea\xad\xb7\x7b\xaf\xfb\x03"
);
payload_vector_test!(
    serialize_branch_full_map,
    Branch {
        branch_map: branch::Map::new(31, 0x7fff_ffff),
        address: Some(AddressInfo::absolute(0xaade_adbe)),
    },
    b"\xf2\xff\xff\xff\xff\xbe\xad\xde\xaa"
);
payload_vector_test!(
    serialize_branch_partial_map,
    Branch {
        branch_map: branch::Map::new(25, 0x1ff_ffff),
        address: Some(AddressInfo::absolute(0xaade_adbe)),
    },
    b"\x92\xff\xff\xff\xfb\xb6\x7a\xab\x02"
);
payload_vector_test!(
    serialize_addr_only,
    AddressInfo::absolute(0xdead_beef),
    b"\xfa\xee\xdb\xea\x0d"
);

#[test]
fn payload_bit_counts() {
    let start = Payload::from(sync::Synchronization::from(sync::Start {
        branch: true,
        privilege: Privilege::MACHINE,
        address: 0xdead_beef,
    }));
    // format + subformat + privilege + context + branch + address
    assert_eq!(start.payload_bits(&Default::default()), Ok(42));

    let addr = Payload::from(AddressInfo::absolute(0xdead_beef));
    assert_eq!(addr.payload_bits(&Default::default()), Ok(2 + 32));
}

fn roundtrip_with(packet: Payload, config: &Config) {
    let mut encoder = Encoder::new([0u8; 32], *config);
    encoder.encode_packet(&packet).unwrap();
    let bits = encoder.bit_count();
    assert_eq!(bits % 8, 0);
    let (buf, len) = encoder.finish();

    let mut decoder = Decoder::new(&buf[..len], *config);
    assert_eq!(decoder.decode_packet(), Ok(packet));
    assert_eq!(decoder.bytes_left(), 0);
}

#[test]
fn roundtrip_sync_start() {
    roundtrip_with(
        sync::Synchronization::from(sync::Start {
            branch: false,
            privilege: Privilege::USER,
            address: 0x8000_0000,
        })
        .into(),
        &Default::default(),
    );
}

#[test]
fn roundtrip_sync_exception() {
    for interrupt in [false, true] {
        roundtrip_with(
            sync::Synchronization::from(sync::Exception {
                branch: true,
                privilege: Privilege::MACHINE,
                address: 0x1c00_8000,
                info: trap::Info {
                    ecause: 0x0b,
                    interrupt,
                    tval: 0xbad_c0de,
                },
            })
            .into(),
            &delta(),
        );
    }
}

#[test]
fn roundtrip_branch_absolute() {
    let packet = Branch {
        branch_map: branch::Map::new(7, 0b101_1010),
        address: Some(AddressInfo::absolute(0x1c00_88a2)),
    };
    roundtrip_with(packet.into(), &Default::default());
    roundtrip_with(packet.into(), &delta());
}

#[test]
fn roundtrip_branch_differential() {
    let packet = Branch {
        branch_map: branch::Map::new(2, 0b01),
        address: Some(AddressInfo::differential(0x40)),
    };
    roundtrip_with(packet.into(), &delta());

    // negative differences sign-extend from the packet boundary
    let packet = Branch {
        branch_map: branch::Map::new(1, 0b1),
        address: Some(AddressInfo::differential(crate::xlen_mask() - 0x3f)),
    };
    roundtrip_with(packet.into(), &delta());
}

#[test]
fn roundtrip_full_map_sentinel() {
    for bits in [0u32, 0x7fff_ffff, 0x2aaa_aaaa, 1 << 30] {
        let packet = Branch {
            branch_map: branch::Map::new(31, bits),
            address: None,
        };
        roundtrip_with(packet.into(), &Default::default());
        // with and without map compression
        let compressing = Config {
            compress_full_branch_map: true,
            ..Default::default()
        };
        roundtrip_with(packet.into(), &compressing);
    }
}

#[test]
fn compressed_full_map_is_shorter() {
    let packet = Payload::from(Branch {
        branch_map: branch::Map::new(31, 0x7fff_ffff),
        address: None,
    });
    let compressing = Config {
        compress_full_branch_map: true,
        ..Default::default()
    };
    let plain = packet.framed_bits(&Default::default()).unwrap();
    let compressed = packet.framed_bits(&compressing).unwrap();
    assert!(compressed < plain);
    assert_eq!(compressed, 16);
}

#[test]
fn roundtrip_addr_only() {
    roundtrip_with(AddressInfo::absolute(0xdead_beef).into(), &Default::default());
    roundtrip_with(AddressInfo::differential(0x124).into(), &delta());
}

#[test]
fn roundtrip_pulp_sext() {
    let quantizing = Config {
        full_address: false,
        use_pulp_sext: true,
        ..Default::default()
    };
    roundtrip_with(AddressInfo::differential(0x124).into(), &quantizing);
    roundtrip_with(
        Branch {
            branch_map: branch::Map::new(3, 0b010),
            address: Some(AddressInfo::absolute(0x1c00_0000)),
        }
        .into(),
        &quantizing,
    );
}

#[test]
fn roundtrip_software_and_timer() {
    roundtrip_with(
        payload::Software { userdata: 0xcafe }.into(),
        &Default::default(),
    );
    roundtrip_with(
        payload::Timer { time: 0xff_1234_5678 }.into(),
        &Default::default(),
    );
}

#[test]
fn chained_packets_roundtrip() {
    let config = delta();
    let first = Payload::from(sync::Synchronization::from(sync::Start {
        branch: true,
        privilege: Privilege::MACHINE,
        address: 0x1c00_0000,
    }));
    let second = Payload::from(AddressInfo::differential(0x80));

    for align in [0u8, 3, 7] {
        let mut encoder = Encoder::new([0u8; 32], config).with_alignment(align).unwrap();
        encoder.encode_packet(&first).unwrap();
        encoder.encode_packet(&second).unwrap();
        let bits = encoder.bit_count();
        let expected =
            first.framed_bits(&config).unwrap() + second.framed_bits(&config).unwrap();
        assert_eq!(bits, expected as usize);
        let (buf, len) = encoder.finish();
        assert_eq!(len, (bits + usize::from(align)).div_ceil(8));

        let mut decoder = Decoder::new(&buf[..len], config)
            .with_alignment(align)
            .unwrap();
        assert_eq!(decoder.decode_packet(), Ok(first));
        assert_eq!(decoder.decode_packet(), Ok(second));
    }
}

#[test]
fn context_sync_is_unimplemented() {
    let mut encoder = Encoder::new([0u8; 16], Default::default());
    let packet = Payload::from(Trace::Sync(Synchronization::Context));
    assert_eq!(encoder.encode_packet(&packet), Err(Error::Unimplemented));
}

#[test]
fn differential_requires_delta_mode() {
    let packet = Payload::from(Branch {
        branch_map: branch::Map::new(1, 1),
        address: Some(AddressInfo::differential(0x40)),
    });
    let mut encoder = Encoder::new([0u8; 16], Default::default());
    assert_eq!(encoder.encode_packet(&packet), Err(Error::BadConfig));

    // a differential packet decoded under a full-address configuration
    let mut encoder = Encoder::new([0u8; 16], delta());
    encoder.encode_packet(&packet).unwrap();
    let (buf, len) = encoder.finish();
    let mut decoder = Decoder::new(&buf[..len], Default::default());
    assert_eq!(decoder.decode_packet(), Err(Error::BadConfig));
}

#[test]
fn alignment_is_checked() {
    let res = Encoder::new([0u8; 16], Default::default()).with_alignment(8);
    assert!(matches!(res, Err(Error::BadAlignment(8))));
    assert_eq!(
        serialize_packet(
            &AddressInfo::absolute(0).into(),
            &Default::default(),
            9,
            &mut [0u8; 16],
        ),
        Err(Error::BadAlignment(9))
    );
}

#[test]
fn truncated_input_reports_missing_bytes() {
    let config = Config::default();
    let mut encoder = Encoder::new([0u8; 16], config);
    encoder
        .encode_packet(&AddressInfo::absolute(0xdead_beef).into())
        .unwrap();
    let (buf, len) = encoder.finish();

    let mut decoder = Decoder::new(&buf[..len - 2], config);
    assert!(matches!(
        decoder.decode_packet(),
        Err(Error::InsufficientData(_))
    ));
}

#[test]
fn unknown_msg_type_is_rejected() {
    // length nibble 0, message type 0
    let mut decoder = Decoder::new(&[0x00], Default::default());
    assert_eq!(decoder.decode_packet(), Err(Error::UnknownMsgType(0)));
}

#[test]
fn padding_detection() {
    let mut decoder = Decoder::new(&[0x00, 0x00], Default::default());
    assert!(decoder.only_padding_left());

    let config = Config::default();
    let mut encoder = Encoder::new([0u8; 16], config);
    encoder
        .encode_packet(&AddressInfo::absolute(0x42).into())
        .unwrap();
    let (buf, len) = encoder.finish();
    let mut decoder = Decoder::new(&buf[..len], config);
    assert!(!decoder.only_padding_left());
    decoder.decode_packet().unwrap();
    assert!(decoder.only_padding_left());
}
