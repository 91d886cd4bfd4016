//! CC1101 transaction decoder
//!
//! Consumes raw sniffer trace bytes chunk by chunk and reports what the host
//! did to the radio through an [`EventSink`].
//!
//! Flow per transaction:
//!   1. `[` asserts chip select
//!   2. The first byte pair is the header; [`classify`] picks the framing
//!   3. Data pairs feed the open phase until it completes or `]` closes it
//!   4. Completed phases become events: register accesses, burst diffs,
//!      strobes, power table bursts and packets
//!
//! A token that fails to parse switches the decoder to resynchronisation:
//! raw input is skipped up to the next `[` and reported as one diagnostic.
//! Protocol violations that make the framing untrustworthy stop the decode
//! with a [`DecodeFailure`].
//!
//! Input may be split anywhere. Partial tokens are held back until the next
//! chunk, so the events produced never depend on how the trace was chunked.

use super::classifier::{Header, Transaction, classify};
use super::config_state::ConfigRegisterImage;
use super::cursor::{CONTEXT, ParseCursor, printable};
use super::packet::{MAX_PACKET, PacketAssembler};
use super::registers::{LAST_WRITABLE, NUM_REGISTERS, SRES, SRX};
use super::tokenizer::{BytePair, Malformation, MalformedToken, Scan, Token, next_token};
use super::types::{
    Access, BurstWrite, DecodeFailure, DecodedEvent, Diagnostic, DiagnosticKind, Direction,
    EventSink, FatalKind, ReceiveEnable, RegisterAccess, TableBurst,
};
use crate::Result;
use tracing::{debug, trace};

/// Longest run of skipped input quoted in a resync diagnostic
const MAX_SKIPPED: usize = 120;

/// Decoder options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Emit a record in the packet stream for every SRX strobe
    pub receive_enable_records: bool,
    /// Emit a zero-length packet for every SRES strobe
    pub reset_records: bool,
    /// Payload bytes kept per packet (1..=100)
    pub max_packet: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            receive_enable_records: false,
            reset_records: false,
            max_packet: MAX_PACKET,
        }
    }
}

impl DecoderConfig {
    pub fn with_receive_enable_records(mut self, enabled: bool) -> Self {
        self.receive_enable_records = enabled;
        self
    }

    pub fn with_reset_records(mut self, enabled: bool) -> Self {
        self.reset_records = enabled;
        self
    }

    pub fn with_max_packet(mut self, max_packet: usize) -> Self {
        self.max_packet = max_packet.clamp(1, MAX_PACKET);
        self
    }
}

/// Open transaction, waiting for data pairs or `]`
#[derive(Debug)]
enum Phase {
    Idle,
    /// One data byte for a register or the PA table
    Single {
        access: Access,
        regnum: u8,
        elapsed_us: u64,
        table: bool,
    },
    RegisterBurstWrite {
        start: u8,
        next: u8,
        elapsed_us: u64,
    },
    RegisterBurstRead {
        next: u8,
    },
    TableBurst {
        access: Access,
        elapsed_us: u64,
        data: Vec<u8>,
    },
    FifoBurst {
        direction: Direction,
        elapsed_us: u64,
    },
}

#[derive(Debug)]
struct Resync {
    kind: DiagnosticKind,
    message: String,
    offset: u64,
    skipped: Vec<u8>,
    overflow: bool,
}

impl Resync {
    fn new(kind: DiagnosticKind, message: String, offset: u64) -> Self {
        Self {
            kind,
            message,
            offset,
            skipped: Vec::new(),
            overflow: false,
        }
    }

    fn skip(&mut self, bytes: &[u8]) {
        let room = MAX_SKIPPED.saturating_sub(self.skipped.len());
        if bytes.len() > room {
            self.overflow = true;
        }
        self.skipped
            .extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn into_diagnostic(self) -> Diagnostic {
        let mut skipped = printable(&self.skipped);
        if self.overflow {
            skipped.push_str("...");
        }
        Diagnostic {
            kind: self.kind,
            message: self.message,
            offset: self.offset,
            skipped: Some(skipped),
        }
    }
}

#[derive(Debug)]
enum Recovery {
    Scanning,
    Resyncing(Resync),
}

#[derive(Debug, Clone, Copy)]
struct PendingFatal {
    kind: FatalKind,
    param: u8,
    offset: u64,
    reported: bool,
}

/// Streaming CC1101 SPI trace decoder
///
/// Feed raw trace bytes with [`feed`](Self::feed) and call
/// [`finish`](Self::finish) once the input ends. After a fatal fault every
/// further call returns the same [`DecodeFailure`].
#[derive(Debug)]
pub struct Cc1101Decoder {
    config: DecoderConfig,
    cursor: ParseCursor,
    registers: ConfigRegisterImage,
    packet: PacketAssembler,
    phase: Phase,
    recovery: Recovery,
    pending_fatal: Option<PendingFatal>,
    transactions: u64,
}

impl Default for Cc1101Decoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl Cc1101Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            cursor: ParseCursor::new(),
            registers: ConfigRegisterImage::new(),
            packet: PacketAssembler::new(config.max_packet),
            phase: Phase::Idle,
            recovery: Recovery::Scanning,
            pending_fatal: None,
            transactions: 0,
        }
    }

    /// Shadow copy of the radio's configuration registers
    pub fn registers(&self) -> &ConfigRegisterImage {
        &self.registers
    }

    pub fn chip_selected(&self) -> bool {
        self.cursor.chip_selected
    }

    pub fn is_resyncing(&self) -> bool {
        matches!(self.recovery, Recovery::Resyncing(_))
    }

    /// Transactions started so far
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    /// Absolute trace offset of the parse position
    pub fn offset(&self) -> u64 {
        self.cursor.absolute(self.cursor.pos())
    }

    /// Decode the next chunk of trace input
    pub fn feed(&mut self, chunk: &[u8], sink: &mut impl EventSink) -> Result<()> {
        trace!("decoding {} bytes at offset {}", chunk.len(), self.offset());
        self.cursor.append(chunk);
        self.run(false, sink)
    }

    /// Flush at end of input
    ///
    /// A partial trailing token or a transaction still open is reported as
    /// a [`DiagnosticKind::TruncatedInput`] diagnostic.
    pub fn finish(&mut self, sink: &mut impl EventSink) -> Result<()> {
        self.run(true, sink)?;
        if !matches!(self.phase, Phase::Idle) {
            let offset = self.offset();
            self.abandon_transaction();
            sink.emit(DecodedEvent::Diagnostic(Diagnostic {
                kind: DiagnosticKind::TruncatedInput,
                message: "input ended inside an open transaction".to_string(),
                offset,
                skipped: None,
            }))?;
        }
        debug!(
            "decoded {} transactions from {} bytes",
            self.transactions,
            self.offset()
        );
        Ok(())
    }

    fn run(&mut self, at_eof: bool, sink: &mut impl EventSink) -> Result<()> {
        loop {
            if let Some(pending) = self.pending_fatal {
                // Hold the fault back until its neighbourhood is complete
                if at_eof || pending.reported || self.cursor.lookahead() >= CONTEXT {
                    self.pending_fatal = Some(PendingFatal {
                        reported: true,
                        ..pending
                    });
                    return Err(self.failure(pending).into());
                }
                return Ok(());
            }

            if self.is_resyncing() && !self.skip_to_select(at_eof, sink)? {
                return Ok(());
            }

            match next_token(self.cursor.buffer(), self.cursor.pos(), at_eof) {
                Ok(Scan::Token { token, start, end }) => {
                    self.cursor.seek(end);
                    self.on_token(token, start, sink)?;
                }
                Ok(Scan::NeedMore) | Ok(Scan::End) => return Ok(()),
                Err(malformed) => self.start_resync(malformed),
            }
        }
    }

    fn on_token(&mut self, token: Token, start: usize, sink: &mut impl EventSink) -> Result<()> {
        match token {
            Token::Elapsed { micros, lost } => {
                self.cursor.pending_us = self.cursor.pending_us.saturating_add(micros);
                self.packet.add_elapsed(micros);
                if lost {
                    sink.emit(DecodedEvent::DataLoss)?;
                }
            }
            Token::BufferWrite(events) => sink.emit(DecodedEvent::BufferMarker { events })?,
            Token::DataLoss => sink.emit(DecodedEvent::DataLoss)?,
            Token::Banner => {
                debug!("sniffer banner at offset {}", self.cursor.absolute(start));
                sink.emit(DecodedEvent::Banner)?;
            }
            Token::Select => self.on_select(start, sink)?,
            Token::Deselect => self.on_deselect(start, sink)?,
            Token::Pair(pair) => self.on_pair(pair, start, sink)?,
        }
        Ok(())
    }

    fn on_select(&mut self, start: usize, sink: &mut impl EventSink) -> Result<()> {
        if !matches!(self.phase, Phase::Idle) {
            // A cut-off FIFO payload stays in `packet` until the next FIFO
            // burst or a resync; a reset before then is fatal
            self.phase = Phase::Idle;
            sink.emit(self.diagnostic(
                DiagnosticKind::ChipSelectInBurst,
                "chip select while a transaction was open".to_string(),
                start,
            ))?;
        }
        self.cursor.chip_selected = true;
        Ok(())
    }

    fn on_deselect(&mut self, start: usize, sink: &mut impl EventSink) -> Result<()> {
        self.cursor.chip_selected = false;
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle | Phase::RegisterBurstRead { .. } => {}
            Phase::Single { regnum, .. } => {
                sink.emit(self.diagnostic(
                    DiagnosticKind::MissingData,
                    format!("chip deselected before data for reg {regnum:02X}"),
                    start,
                ))?;
            }
            Phase::RegisterBurstWrite {
                start: first,
                next,
                elapsed_us,
            } => {
                let changes = self.registers.apply_staged(first..next);
                sink.emit(DecodedEvent::BurstWrite(BurstWrite {
                    elapsed_us,
                    start: first,
                    bytes_written: usize::from(next - first),
                    changes,
                }))?;
            }
            Phase::TableBurst {
                access,
                elapsed_us,
                data,
            } => {
                sink.emit(DecodedEvent::TableBurst(TableBurst {
                    elapsed_us,
                    access,
                    data,
                }))?;
            }
            Phase::FifoBurst { elapsed_us, .. } => self.close_packet(elapsed_us, start, sink)?,
        }
        Ok(())
    }

    fn close_packet(&mut self, elapsed_us: u64, start: usize, sink: &mut impl EventSink) -> Result<()> {
        // Zero-length packets are reserved for reset markers
        if self.packet.total_bytes() == 0 {
            self.packet.abandon();
            return sink
                .emit(self.diagnostic(
                    DiagnosticKind::MissingData,
                    "FIFO burst without data".to_string(),
                    start,
                ))
                .map_err(Into::into);
        }

        let packet = self.packet.finish(&self.registers);
        let truncated = packet
            .is_truncated()
            .then(|| format!("packet of {} bytes truncated to {}", packet.total_bytes, packet.len()));
        sink.emit(DecodedEvent::Packet { elapsed_us, packet })?;
        if let Some(message) = truncated {
            sink.emit(self.diagnostic(DiagnosticKind::PacketTruncated, message, start))?;
        }
        Ok(())
    }

    fn on_pair(&mut self, pair: BytePair, start: usize, sink: &mut impl EventSink) -> Result<()> {
        match &mut self.phase {
            Phase::Idle => return self.begin_transaction(pair.master, start, sink),
            Phase::Single {
                access,
                regnum,
                elapsed_us,
                table,
            } => {
                let event = RegisterAccess {
                    elapsed_us: *elapsed_us,
                    access: *access,
                    regnum: *regnum,
                    value: data_byte(*access, pair),
                };
                // PA table entries are not part of the register image
                if event.access == Access::Write && !*table {
                    self.registers.commit(event.regnum, event.value);
                }
                self.phase = Phase::Idle;
                sink.emit(DecodedEvent::Register(event))?;
            }
            Phase::RegisterBurstWrite { next, .. } => {
                if *next > LAST_WRITABLE {
                    let regnum = *next;
                    return self.fatal(FatalKind::BurstWriteOverflow, regnum, start);
                }
                self.registers.stage(*next, pair.master);
                *next += 1;
            }
            Phase::RegisterBurstRead { next } => {
                let regnum = *next;
                if usize::from(regnum) >= NUM_REGISTERS {
                    return self.fatal(FatalKind::BurstReadOverflow, regnum, start);
                }
                *next += 1;
                let elapsed_us = self.cursor.take_elapsed();
                sink.emit(DecodedEvent::Register(RegisterAccess {
                    elapsed_us,
                    access: Access::Read,
                    regnum,
                    value: pair.slave,
                }))?;
            }
            Phase::TableBurst { access, data, .. } => data.push(data_byte(*access, pair)),
            Phase::FifoBurst { direction, .. } => {
                let byte = data_byte(direction.access(), pair);
                if !self.packet.push(byte) {
                    trace!("packet byte {} beyond cap", self.packet.total_bytes());
                }
            }
        }
        Ok(())
    }

    fn begin_transaction(&mut self, master: u8, start: usize, sink: &mut impl EventSink) -> Result<()> {
        let header = Header::from(master);
        let transaction = classify(header);
        self.transactions += 1;
        trace!(
            "transaction {} at offset {}: {:?}",
            self.transactions,
            self.cursor.absolute(start),
            transaction
        );

        if !self.cursor.chip_selected && !matches!(transaction, Transaction::Unsupported(_)) {
            if let Some(kind) = transaction.select_fault() {
                return self.fatal(kind, header.regnum, start);
            }
            sink.emit(self.diagnostic(
                DiagnosticKind::NotSelected,
                format!("transaction without chip selected at reg {:02X}", header.regnum),
                start,
            ))?;
        }

        self.phase = match transaction {
            Transaction::Unsupported(kind) => return self.fatal(kind, header.regnum, start),
            Transaction::Strobe(regnum) => return self.on_strobe(regnum, start, sink),
            Transaction::TableSingle(access) => Phase::Single {
                access,
                regnum: header.regnum,
                elapsed_us: self.cursor.take_elapsed(),
                table: true,
            },
            Transaction::Register {
                access,
                burst: false,
                regnum,
            } => Phase::Single {
                access,
                regnum,
                elapsed_us: self.cursor.take_elapsed(),
                table: false,
            },
            Transaction::Register {
                access: Access::Write,
                burst: true,
                regnum,
            } => Phase::RegisterBurstWrite {
                start: regnum,
                next: regnum,
                elapsed_us: self.cursor.take_elapsed(),
            },
            Transaction::Register {
                access: Access::Read,
                burst: true,
                regnum,
            } => Phase::RegisterBurstRead { next: regnum },
            Transaction::TableBurst(access) => Phase::TableBurst {
                access,
                elapsed_us: self.cursor.take_elapsed(),
                data: Vec::new(),
            },
            Transaction::FifoBurst(direction) => {
                self.packet.begin(direction);
                Phase::FifoBurst {
                    direction,
                    elapsed_us: self.cursor.take_elapsed(),
                }
            }
        };
        Ok(())
    }

    fn on_strobe(&mut self, regnum: u8, start: usize, sink: &mut impl EventSink) -> Result<()> {
        let elapsed_us = self.cursor.take_elapsed();
        sink.emit(DecodedEvent::Strobe { elapsed_us, regnum })?;

        if regnum == SRES {
            if !self.packet.is_empty() {
                let length = u8::try_from(self.packet.len()).unwrap_or(u8::MAX);
                return self.fatal(FatalKind::ResetWithOpenPacket, length, start);
            }
            if self.config.reset_records {
                let packet = self.packet.reset_marker(&self.registers);
                sink.emit(DecodedEvent::Packet {
                    elapsed_us: 0,
                    packet,
                })?;
            }
        } else if regnum == SRX && self.config.receive_enable_records {
            sink.emit(DecodedEvent::ReceiveEnable(ReceiveEnable {
                elapsed_us: self.packet.take_elapsed(),
                channel: self.registers.channel(),
                sync: self.registers.sync_word(),
            }))?;
        }
        Ok(())
    }

    /// Drop whatever the open transaction collected
    fn abandon_transaction(&mut self) {
        if let Phase::FifoBurst { .. } = std::mem::replace(&mut self.phase, Phase::Idle) {
            self.packet.abandon();
        }
    }

    fn start_resync(&mut self, malformed: MalformedToken) {
        let kind = match malformed.kind {
            Malformation::Truncated => DiagnosticKind::TruncatedInput,
            _ => DiagnosticKind::MalformedToken,
        };
        let offset = self.cursor.absolute(malformed.at);
        debug!("{} at offset {}, resynchronising", malformed.kind, offset);

        self.abandon_transaction();
        self.cursor.seek(malformed.at);
        self.recovery = Recovery::Resyncing(Resync::new(kind, malformed.kind.to_string(), offset));
    }

    /// Skip raw input up to the next `[`; true once scanning can resume
    fn skip_to_select(&mut self, at_eof: bool, sink: &mut impl EventSink) -> Result<bool> {
        let Recovery::Resyncing(resync) = &mut self.recovery else {
            return Ok(true);
        };

        let remaining = self.cursor.remaining();
        let found = remaining.iter().position(|&c| c == b'[');
        let skipped = &remaining[..found.unwrap_or(remaining.len())];
        let deselected = skipped.contains(&b']');
        let count = skipped.len();
        resync.skip(skipped);

        self.cursor.advance(count);
        if deselected {
            self.cursor.chip_selected = false;
        }
        if found.is_none() && !at_eof {
            return Ok(false);
        }

        if let Recovery::Resyncing(resync) = std::mem::replace(&mut self.recovery, Recovery::Scanning) {
            debug!("resynchronised at offset {}", self.offset());
            sink.emit(DecodedEvent::Diagnostic(resync.into_diagnostic()))?;
        }
        Ok(true)
    }

    /// Stop decoding at the token starting at `start`
    fn fatal(&mut self, kind: FatalKind, param: u8, start: usize) -> Result<()> {
        self.cursor.seek(start);
        let offset = self.cursor.absolute(start);
        debug!("fatal: {kind}, {param:02X} at offset {offset}");
        self.pending_fatal = Some(PendingFatal {
            kind,
            param,
            offset,
            reported: false,
        });
        Ok(())
    }

    fn failure(&self, pending: PendingFatal) -> DecodeFailure {
        let (before, after) = self.cursor.neighbourhood(CONTEXT);
        DecodeFailure {
            kind: pending.kind,
            param: pending.param,
            offset: pending.offset,
            before,
            after,
        }
    }

    fn diagnostic(&self, kind: DiagnosticKind, message: String, start: usize) -> DecodedEvent {
        DecodedEvent::Diagnostic(Diagnostic {
            kind,
            message,
            offset: self.cursor.absolute(start),
            skipped: None,
        })
    }
}

/// The byte that carries data for an access: MOSI for writes, MISO for reads
fn data_byte(access: Access, pair: BytePair) -> u8 {
    match access {
        Access::Read => pair.slave,
        Access::Write => pair.master,
    }
}
