// Copyright (C) 2025, 2026 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Stream adapters for the text and binary exchange formats
//!
//! Three formats are supported:
//! - the line-oriented stimulus text format emitted by the RTL testbench
//!   (`valid= 1 exception= 0 ... addr= 1c008080 instr= 4481`),
//! - the CSV instruction trace format
//!   (`VALID,ADDRESS,INSN,PRIVILEGE,EXCEPTION,ECAUSE,TVAL,INTERRUPT`),
//! - the packet binary format written by the packet [`Encoder`].
//!
//! The line parsers are plain functions over [`str`]; the surrounding
//! functions wire them up to [`std::io`] readers and writers.


use std::io::{BufRead, BufReader, Read, Write};
use std::string::String;
use std::vec::Vec;

use crate::config::Config;
use crate::packet::{self, Decoder, Payload};
use crate::truncate_addr;
use crate::types::{Privilege, Record};

/// Header line of the CSV instruction trace format
pub const CSV_HEADER: &str = "VALID,ADDRESS,INSN,PRIVILEGE,EXCEPTION,ECAUSE,TVAL,INTERRUPT";

/// Stream adapter errors
#[derive(Debug)]
pub enum Error {
    /// An underlying I/O operation failed
    Io(std::io::Error),
    /// The CSV header line is missing or malformed
    BadCsvHeader,
    /// A line could not be scanned
    ///
    /// Carries the one-based line number.
    Scan(usize),
    /// A line contained the wrong number of fields
    ///
    /// Carries the one-based line number.
    ScanState(usize),
    /// A packet could not be decoded or encoded
    Packet(packet::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<packet::Error> for Error {
    fn from(e: packet::Error) -> Self {
        Self::Packet(e)
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Packet(e) => Some(e),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(_) => write!(f, "i/o operation failed"),
            Self::BadCsvHeader => write!(f, "missing or malformed CSV header"),
            Self::Scan(line) => write!(f, "cannot scan line {line}"),
            Self::ScanState(line) => write!(f, "wrong number of fields on line {line}"),
            Self::Packet(_) => write!(f, "packet codec failure"),
        }
    }
}

/// Parse a single line of the stimulus text format
///
/// A line consists of `key= value` pairs in a fixed order; the space after
/// the `=` is optional. Integer fields are hexadecimal except for the
/// `valid`, `exception`, `interrupt` and `compressed` flags.
pub fn parse_stimulus_line(line: &str) -> Option<Record> {
    let mut fields = KeyValues::new(line);
    let valid = fields.flag("valid")?;
    let exception = fields.flag("exception")?;
    let interrupt = fields.flag("interrupt")?;
    let cause = fields.hex("cause")?;
    let tval = fields.hex("tval")?;
    let privilege = fields.hex("priv")?;
    let compressed = fields.flag("compressed")?;
    let iaddr = fields.hex("addr")?;
    let instr = fields.hex("instr")?;
    Some(Record {
        valid,
        iaddr: truncate_addr(iaddr),
        instr,
        compressed,
        privilege: Privilege::new(privilege as u8),
        exception,
        interrupt,
        cause: cause as u32,
        tval,
    })
}

/// Format a single [`Record`] as a stimulus text line
pub fn format_stimulus_line(record: &Record) -> String {
    std::format!(
        "valid= {} exception= {} interrupt= {} cause= {:02x} tval= {:08x} \
         priv= {:x} compressed= {} addr= {:08x} instr= {:08x}",
        record.valid as u8,
        record.exception as u8,
        record.interrupt as u8,
        record.cause,
        record.tval,
        record.privilege.raw(),
        record.compressed as u8,
        record.iaddr,
        record.instr,
    )
}

/// Read an instruction stream in the stimulus text format
pub fn read_stimulus<R: Read>(reader: R) -> Result<Vec<Record>, Error> {
    let mut records = Vec::new();
    for (n, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_stimulus_line(&line).ok_or(Error::Scan(n + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Write an instruction stream in the stimulus text format
pub fn write_stimulus<W: Write>(mut writer: W, records: &[Record]) -> Result<(), Error> {
    for record in records {
        writeln!(writer, "{}", format_stimulus_line(record))?;
    }
    Ok(())
}

/// Parse a single CSV data line
///
/// The fields follow the [`CSV_HEADER`] column order. The `compressed` flag
/// is derived from the instruction word.
pub fn parse_csv_line(line: &str) -> Option<Record> {
    let mut fields = line.trim_end().split(',');
    let valid = parse_flag(fields.next()?)?;
    let iaddr = parse_hex(fields.next()?)?;
    let instr = parse_hex(fields.next()?)?;
    let privilege = parse_hex(fields.next()?)?;
    let exception = parse_flag(fields.next()?)?;
    let cause = parse_hex(fields.next()?)?;
    let tval = parse_hex(fields.next()?)?;
    let interrupt = parse_flag(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    Some(Record {
        valid,
        iaddr: truncate_addr(iaddr),
        instr,
        compressed: instr & 0x3 != 0x3,
        privilege: Privilege::new(privilege as u8),
        exception,
        interrupt,
        cause: cause as u32,
        tval,
    })
}

/// Format a single [`Record`] as a CSV data line
pub fn format_csv_line(record: &Record) -> String {
    std::format!(
        "{},{:08x},{:08x},{:x},{},{:02x},{:08x},{}",
        record.valid as u8,
        record.iaddr,
        record.instr,
        record.privilege.raw(),
        record.exception as u8,
        record.cause,
        record.tval,
        record.interrupt as u8,
    )
}

/// Read an instruction stream in the CSV format
///
/// The first line must match [`CSV_HEADER`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Record>, Error> {
    let mut lines = BufReader::new(reader).lines();
    let header = lines.next().ok_or(Error::BadCsvHeader)??;
    if header.trim_end() != CSV_HEADER {
        return Err(Error::BadCsvHeader);
    }

    let mut records = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_csv_line(&line).ok_or(Error::ScanState(n + 2))?;
        records.push(record);
    }
    Ok(records)
}

/// Write an instruction stream in the CSV format, including the header
pub fn write_csv<W: Write>(mut writer: W, records: &[Record]) -> Result<(), Error> {
    writeln!(writer, "{CSV_HEADER}")?;
    for record in records {
        writeln!(writer, "{}", format_csv_line(record))?;
    }
    Ok(())
}

/// Read all packets from a binary packet stream
///
/// Reads to the end of the stream. Trailing all-zero padding, as flushed by
/// [`write_packets`], is skipped.
pub fn read_packets<R: Read>(mut reader: R, config: &Config) -> Result<Vec<Payload>, Error> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let mut decoder = Decoder::new(&data, *config);
    let mut packets = Vec::new();
    while !decoder.only_padding_left() {
        packets.push(decoder.decode_packet()?);
    }
    Ok(packets)
}

/// Write all packets as a binary packet stream
///
/// Packets are framed and packed back to back. Returns the number of bytes
/// written.
pub fn write_packets<W: Write>(
    mut writer: W,
    packets: &[Payload],
    config: &Config,
) -> Result<usize, Error> {
    let mut total_bits = 0u64;
    for packet in packets {
        total_bits += u64::from(packet.framed_bits(config)?);
    }

    let mut buf = std::vec![0u8; total_bits.div_ceil(8) as usize];
    let mut encoder = packet::Encoder::new(buf.as_mut_slice(), *config);
    for packet in packets {
        encoder.encode_packet(packet)?;
    }

    writer.write_all(&buf)?;
    Ok(buf.len())
}

/// Cursor over `key= value` pairs of a stimulus line
struct KeyValues<'l> {
    tokens: core::str::SplitWhitespace<'l>,
}

impl<'l> KeyValues<'l> {
    fn new(line: &'l str) -> Self {
        Self {
            tokens: line.split_whitespace(),
        }
    }

    /// Retrieve the value of the next field, which must have the given key
    ///
    /// Accepts both `key= value` and `key=value`.
    fn value(&mut self, key: &str) -> Option<&'l str> {
        let token = self.tokens.next()?;
        let rest = token.strip_prefix(key)?.strip_prefix('=')?;
        if rest.is_empty() {
            self.tokens.next()
        } else {
            Some(rest)
        }
    }

    fn flag(&mut self, key: &str) -> Option<bool> {
        parse_flag(self.value(key)?)
    }

    fn hex(&mut self, key: &str) -> Option<u64> {
        parse_hex(self.value(key)?)
    }
}

fn parse_flag(field: &str) -> Option<bool> {
    match field.trim() {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn parse_hex(field: &str) -> Option<u64> {
    u64::from_str_radix(field.trim(), 16).ok()
}
