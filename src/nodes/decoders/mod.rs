//! CC1101 trace decoding
//!
//! Bottom-up: the register catalog and the tokenizer know nothing about
//! transactions; the classifier frames a transaction from its header byte;
//! [`Cc1101Decoder`] drives them all over a stream of trace chunks.

pub mod cc1101_decoder;
pub mod classifier;
pub mod config_state;
pub mod cursor;
pub mod packet;
pub mod registers;
pub mod tokenizer;
pub mod types;

// Re-export common types
pub use types::{
    Access, BurstWrite, DecodeFailure, DecodedEvent, Diagnostic, DiagnosticKind, Direction,
    EventSink, FatalKind, PacketRecord, ReceiveEnable, RegisterAccess, RegisterChange, TableBurst,
};

// Re-export the decoder
pub use cc1101_decoder::{Cc1101Decoder, DecoderConfig};
pub use config_state::ConfigRegisterImage;
