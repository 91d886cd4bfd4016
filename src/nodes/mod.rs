//! Sources, decoders and sinks
//!
//! - **Sources** read raw trace bytes on their own thread (capture file or
//!   live port) and send them over a crossbeam channel
//! - **Decoders** turn the byte stream into [`DecodedEvent`]s
//! - **Sinks** consume the events; [`LogFormatter`] writes the two logs
//!
//! [`DecodedEvent`]: decoders::DecodedEvent

pub mod decoders;
mod formatter;
mod trace_source;

pub use formatter::LogFormatter;
pub use trace_source::{CHUNK_SIZE, TraceSource};
