//! Runtime support: channel plumbing between trace sources and the decoder

pub mod errors;
pub mod receiver;
pub mod sender;

pub use errors::{WorkError, WorkResult};
pub use receiver::{Receiver, channel};
pub use sender::{ChannelMessage, Sender};
