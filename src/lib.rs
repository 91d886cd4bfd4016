//! CC1101 SPI sniffer trace decoder
//!
//! Reconstructs what a host microcontroller did to a CC1101 radio from the
//! ASCII trace written by an SPI bus sniffer: register reads and writes,
//! command strobes, burst configuration writes with per-register diffs, and
//! the packets moved through the TX and RX FIFOs.
//!
//! # Architecture
//!
//! - **TraceSource**: reads a capture file or a live sniffer port on its own
//!   thread and passes raw chunks over a crossbeam channel
//! - **Cc1101Decoder**: streaming, chunk-independent decoder; owns the
//!   register shadow image and the packet being reassembled
//! - **LogFormatter**: renders decoded events to the command and packet logs
//!
//! # Example
//!
//! ```no_run
//! use cc1101_sniff::{Cc1101Decoder, DecoderConfig, LogFormatter, TraceSource};
//!
//! let mut source = TraceSource::file("spi.dat")?;
//! let mut decoder = Cc1101Decoder::new(DecoderConfig::default());
//! let mut logs = LogFormatter::new(std::io::stdout(), std::io::sink());
//! while let Ok(chunk) = source.recv() {
//!     decoder.feed(&chunk, &mut logs)?;
//! }
//! decoder.finish(&mut logs)?;
//! # Ok::<(), cc1101_sniff::SnifferError>(())
//! ```

use thiserror::Error;

pub mod nodes;
pub mod runtime;

// Re-export decoder data types
pub use nodes::decoders::{
    Access, BurstWrite, DecodeFailure, DecodedEvent, Diagnostic, DiagnosticKind, Direction,
    EventSink, FatalKind, PacketRecord, ReceiveEnable, RegisterAccess, RegisterChange, TableBurst,
};

// Re-export the decoder, sources and sinks
pub use nodes::decoders::{Cc1101Decoder, ConfigRegisterImage, DecoderConfig};
pub use nodes::{LogFormatter, TraceSource};

// Re-export runtime components
pub use runtime::{WorkError, WorkResult};

#[derive(Error, Debug)]
pub enum SnifferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeFailure),

    #[error("Source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, SnifferError>;
