//! Log formatter
//!
//! Renders decoded events as text: every event goes to the detailed command
//! log (optionally echoed to the console); packets, reset markers and
//! receive-enable records also go to the packet log.

use crate::nodes::decoders::registers::{self, FIFO, PATABLE};
use crate::nodes::decoders::{
    BurstWrite, DecodeFailure, DecodedEvent, Diagnostic, Direction, EventSink, PacketRecord,
    ReceiveEnable, RegisterAccess, TableBurst,
};
use std::io::{self, Write};

/// Blank time column
const NO_TIME: &str = "           ";

/// Extra space before a sent packet's payload in the packet log
const SENT_INDENT: &str = "   ";

/// Writes the command log and the packet log
pub struct LogFormatter<C: Write, P: Write> {
    commands: C,
    packets: P,
    echo: Option<Box<dyn Write>>,
    lines: u64,
}

impl<C: Write, P: Write> LogFormatter<C, P> {
    pub fn new(commands: C, packets: P) -> Self {
        Self {
            commands,
            packets,
            echo: None,
            lines: 0,
        }
    }

    /// Copy every command log line to `echo`
    pub fn with_echo(mut self, echo: impl Write + 'static) -> Self {
        self.echo = Some(Box::new(echo));
        self
    }

    /// Command log lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Render one event
    pub fn write_event(&mut self, event: &DecodedEvent) -> io::Result<()> {
        match event {
            DecodedEvent::Banner => Ok(()),
            DecodedEvent::BufferMarker { events } => {
                self.command(&format!("received a buffer with {events} events"))
            }
            DecodedEvent::DataLoss => self.command("*** data lost ***"),
            DecodedEvent::Register(access) => self.command(&register_line(access)),
            DecodedEvent::BurstWrite(burst) => {
                for line in burst_write_lines(burst) {
                    self.command(&line)?;
                }
                Ok(())
            }
            DecodedEvent::TableBurst(burst) => self.command(&table_burst_line(burst)),
            DecodedEvent::Strobe { elapsed_us, regnum } => {
                let (name, description) = registers::strobe(*regnum)
                    .map_or(("UNKNOWN", ""), |s| (s.name, s.description));
                self.command(&format!(
                    "{}command {regnum:02X}: {name} ({description})",
                    time_column(*elapsed_us)
                ))
            }
            DecodedEvent::Packet { elapsed_us, packet } => {
                if !packet.is_reset() {
                    self.command(&fifo_burst_line(*elapsed_us, packet))?;
                }
                self.packet(&packet_line(packet))
            }
            DecodedEvent::ReceiveEnable(record) => self.packet(&receive_enable_line(record)),
            DecodedEvent::Diagnostic(diagnostic) => self.command(&diagnostic_line(diagnostic)),
        }
    }

    /// Report a fatal fault with the trace text around it
    pub fn write_fatal(&mut self, failure: &DecodeFailure) -> io::Result<()> {
        self.command(&format!("**** {}, {:02X}", failure.kind, failure.param))?;
        self.command(&failure.neighbourhood().to_string())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.commands.flush()?;
        self.packets.flush()?;
        if let Some(echo) = self.echo.as_mut() {
            echo.flush()?;
        }
        Ok(())
    }

    /// Flush and hand back the two log writers
    pub fn into_inner(mut self) -> io::Result<(C, P)> {
        self.flush()?;
        Ok((self.commands, self.packets))
    }

    fn command(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.commands, "{line}")?;
        if let Some(echo) = self.echo.as_mut() {
            writeln!(echo, "{line}")?;
        }
        self.lines += 1;
        Ok(())
    }

    fn packet(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.packets, "{line}")
    }
}

impl<C: Write, P: Write> EventSink for LogFormatter<C, P> {
    fn emit(&mut self, event: DecodedEvent) -> io::Result<()> {
        self.write_event(&event)
    }
}

/// `  s.uuuuuu ` or blanks when no time has passed
fn time_column(elapsed_us: u64) -> String {
    if elapsed_us == 0 {
        NO_TIME.to_string()
    } else {
        format!("{} ", seconds(elapsed_us))
    }
}

fn seconds(elapsed_us: u64) -> String {
    format!("{:3}.{:06}", elapsed_us / 1_000_000, elapsed_us % 1_000_000)
}

/// `NAME (description) as VV[ decoded]`
fn register_value(regnum: u8, value: u8) -> String {
    let descriptor = registers::register(regnum);
    let mut text = format!(
        "{regnum:02X}: {} ({}) as {value:02X}",
        descriptor.name, descriptor.description
    );
    if let Some(decoded) = descriptor.describe(value) {
        text.push(' ');
        text.push_str(&decoded);
    }
    text
}

fn register_line(access: &RegisterAccess) -> String {
    format!(
        "{}{} {}",
        time_column(access.elapsed_us),
        access.access.keyword(),
        register_value(access.regnum, access.value)
    )
}

fn burst_write_lines(burst: &BurstWrite) -> Vec<String> {
    let mut elapsed_us = burst.elapsed_us;
    let mut lines = Vec::with_capacity(burst.changes.len() + 1);
    for change in &burst.changes {
        lines.push(format!(
            "{} wrote {}",
            time_column(std::mem::take(&mut elapsed_us)),
            register_value(change.regnum, change.new)
        ));
    }
    lines.push(format!(
        "{} burst wrote {} registers, and {} changed",
        time_column(elapsed_us),
        burst.bytes_written,
        burst.changes.len()
    ));
    lines
}

/// `burst KW RR: NAME (description) as` followed by the bytes
fn burst_header(elapsed_us: u64, keyword: &str, regnum: u8) -> String {
    let descriptor = registers::register(regnum);
    format!(
        "{}burst {keyword} {regnum:02X}: {} ({}) as",
        time_column(elapsed_us),
        descriptor.name,
        descriptor.description
    )
}

/// ` XX XX ...`
fn hex_bytes(data: &[u8]) -> String {
    data.iter().map(|byte| format!(" {byte:02X}")).collect()
}

fn table_burst_line(burst: &TableBurst) -> String {
    let header = burst_header(burst.elapsed_us, burst.access.keyword(), PATABLE);
    header + &hex_bytes(&burst.data)
}

fn fifo_burst_line(elapsed_us: u64, packet: &PacketRecord) -> String {
    let header = burst_header(elapsed_us, packet.direction.access().keyword(), FIFO);
    header + &hex_bytes(&packet.data)
}

fn packet_line(packet: &PacketRecord) -> String {
    if packet.is_reset() {
        return format!("{} sec rset", seconds(packet.elapsed_us));
    }
    // Sent payloads are indented to line up with received ones
    let indent = match packet.direction {
        Direction::Sent => SENT_INDENT,
        Direction::Received => "",
    };
    format!(
        "{} sec {} {:2} bytes chan {:02X} sync {:02X} {:02X} data{indent}{}",
        seconds(packet.elapsed_us),
        packet.direction.keyword(),
        packet.len(),
        packet.channel,
        packet.sync[0],
        packet.sync[1],
        hex_bytes(&packet.data)
    )
}

fn receive_enable_line(record: &ReceiveEnable) -> String {
    format!(
        "{} sec rcv enable on chan {:02X} sync {:02X} {:02X}",
        seconds(record.elapsed_us),
        record.channel,
        record.sync[0],
        record.sync[1]
    )
}

fn diagnostic_line(diagnostic: &Diagnostic) -> String {
    match &diagnostic.skipped {
        Some(skipped) => format!(
            "*** {} at offset {}, skipping {skipped}.",
            diagnostic.message, diagnostic.offset
        ),
        None => format!("*** {} at offset {}", diagnostic.message, diagnostic.offset),
    }
}
