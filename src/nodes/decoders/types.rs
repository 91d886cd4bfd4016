//! Common decoder types: transaction metadata, decoded events and faults

use std::fmt;
use std::io;

/// Direction of a register access, seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    /// Keyword used in the detailed log
    pub fn keyword(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }
}

/// Packet direction, seen from the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Written to the TX FIFO by the host
    Sent,
    /// Read from the RX FIFO by the host
    Received,
}

impl Direction {
    /// Keyword used in the packet log
    pub fn keyword(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "rcvd",
        }
    }

    /// FIFO access that carries a packet in this direction
    pub fn access(&self) -> Access {
        match self {
            Direction::Sent => Access::Write,
            Direction::Received => Access::Read,
        }
    }
}

/// Single register read or write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAccess {
    /// Microseconds since the previous logged command
    pub elapsed_us: u64,
    pub access: Access,
    pub regnum: u8,
    pub value: u8,
}

/// One register whose value changed during a burst write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChange {
    pub regnum: u8,
    pub old: u8,
    pub new: u8,
}

/// Burst write of consecutive configuration registers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstWrite {
    pub elapsed_us: u64,
    /// First register of the burst
    pub start: u8,
    /// Number of data bytes transferred
    pub bytes_written: usize,
    /// Only the registers whose value differed from the shadow copy
    pub changes: Vec<RegisterChange>,
}

/// Burst access to the PA power table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBurst {
    pub elapsed_us: u64,
    pub access: Access,
    pub data: Vec<u8>,
}

/// A completed packet transfer, or a chip reset marker when `data` is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    /// Microseconds since the previous packet record
    pub elapsed_us: u64,
    pub direction: Direction,
    /// Payload, capped at the configured maximum packet length
    pub data: Vec<u8>,
    /// Bytes consumed from the trace, including any beyond the cap
    pub total_bytes: usize,
    /// CHANNR at the time the packet completed
    pub channel: u8,
    /// SYNC1, SYNC0 at the time the packet completed
    pub sync: [u8; 2],
}

impl PacketRecord {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A zero-length record marks a chip reset, not a transfer
    pub fn is_reset(&self) -> bool {
        self.data.is_empty() && self.total_bytes == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.total_bytes > self.data.len()
    }
}

/// Synthetic record written when the receiver is enabled (SRX strobe)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveEnable {
    /// Microseconds since the previous packet record
    pub elapsed_us: u64,
    pub channel: u8,
    pub sync: [u8; 2],
}

/// Recoverable problem categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A token did not parse; the decoder skipped to the next chip select
    MalformedToken,
    /// Chip select asserted while a transaction was still open
    ChipSelectInBurst,
    /// Chip select released before a single access carried its data byte
    MissingData,
    /// Transaction started without chip select asserted
    NotSelected,
    /// Packet longer than the payload buffer; excess bytes dropped
    PacketTruncated,
    /// Input ended inside a token or an open transaction
    TruncatedInput,
}

/// Inline warning, logged at the point it occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Absolute byte offset in the trace
    pub offset: u64,
    /// Raw text discarded while resynchronizing
    pub skipped: Option<String>,
}

/// Everything the decoder reports, in trace order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Producer banner line, discarded
    Banner,
    /// Producer flushed a buffer holding this many bus events
    BufferMarker { events: u32 },
    /// Producer reported lost data
    DataLoss,
    Register(RegisterAccess),
    BurstWrite(BurstWrite),
    TableBurst(TableBurst),
    Strobe { elapsed_us: u64, regnum: u8 },
    /// FIFO burst (or reset marker); `elapsed_us` is the command time
    Packet { elapsed_us: u64, packet: PacketRecord },
    ReceiveEnable(ReceiveEnable),
    Diagnostic(Diagnostic),
}

/// Consumer of decoded events
///
/// The decoder hands each event over as soon as it is complete and never
/// looks at it again.
pub trait EventSink {
    fn emit(&mut self, event: DecodedEvent) -> io::Result<()>;
}

impl EventSink for Vec<DecodedEvent> {
    fn emit(&mut self, event: DecodedEvent) -> io::Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Protocol invariant violations that stop the decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FatalKind {
    #[error("reset with packet length not zero")]
    ResetWithOpenPacket,
    #[error("burst RX FIFO read without chip selected")]
    RxFifoNotSelected,
    #[error("burst TX FIFO write without chip selected")]
    TxFifoNotSelected,
    #[error("burst power table access without chip selected")]
    TableNotSelected,
    #[error("unsupported non-burst RX FIFO read")]
    SingleRxFifoRead,
    #[error("unsupported non-burst TX FIFO write")]
    SingleTxFifoWrite,
    #[error("too much burst data")]
    BurstWriteOverflow,
    #[error("burst read of too many config registers")]
    BurstReadOverflow,
}

/// A fatal fault with the neighbourhood of the trace where it happened
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}, {param:02X} at offset {offset}")]
pub struct DecodeFailure {
    pub kind: FatalKind,
    /// Register number or packet length, depending on `kind`
    pub param: u8,
    /// Absolute byte offset of the offending token
    pub offset: u64,
    /// Trace text just before the offending token
    pub before: String,
    /// Trace text from the offending token on
    pub after: String,
}

impl DecodeFailure {
    /// Neighbourhood with a marker where the cursor sat
    pub fn neighbourhood(&self) -> Neighbourhood<'_> {
        Neighbourhood(self)
    }
}

pub struct Neighbourhood<'a>(&'a DecodeFailure);

impl fmt::Display for Neighbourhood<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-- error --> {}", self.0.before, self.0.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_record_reset_marker() {
        let record = PacketRecord {
            elapsed_us: 10,
            direction: Direction::Received,
            data: Vec::new(),
            total_bytes: 0,
            channel: 0,
            sync: [0, 0],
        };
        assert!(record.is_reset());
        assert!(!record.is_truncated());
    }

    #[test]
    fn test_packet_record_truncated() {
        let record = PacketRecord {
            elapsed_us: 0,
            direction: Direction::Sent,
            data: vec![0; 100],
            total_bytes: 104,
            channel: 0,
            sync: [0, 0],
        };
        assert!(record.is_truncated());
        assert!(!record.is_reset());
        assert_eq!(record.len(), 100);
    }

    #[test]
    fn test_failure_display() {
        let failure = DecodeFailure {
            kind: FatalKind::BurstWriteOverflow,
            param: 0x2F,
            offset: 42,
            before: "[402F".to_string(),
            after: "0100]".to_string(),
        };
        assert_eq!(failure.to_string(), "too much burst data, 2F at offset 42");
        assert_eq!(
            failure.neighbourhood().to_string(),
            "[402F <-- error --> 0100]"
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(Access::Read.keyword(), "read");
        assert_eq!(Direction::Received.keyword(), "rcvd");
        assert_eq!(Direction::Sent.access(), Access::Write);
    }
}
