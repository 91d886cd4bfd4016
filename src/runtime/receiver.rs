//! Channel receiver that unwraps [`ChannelMessage`] and caches end-of-stream
//!
//! After `EndOfStream` (or a disconnect) every further call returns
//! `WorkError::Shutdown` without touching the channel.

use crossbeam_channel::Receiver as CrossbeamReceiver;

use super::errors::{WorkError, WorkResult};
use super::sender::ChannelMessage;

pub struct Receiver<T> {
    receiver: CrossbeamReceiver<ChannelMessage<T>>,
    eos: bool,
}

impl<T> Receiver<T> {
    pub fn new(receiver: CrossbeamReceiver<ChannelMessage<T>>) -> Self {
        Self {
            receiver,
            eos: false,
        }
    }

    /// Blocking receive
    ///
    /// Returns `Err(WorkError::Shutdown)` if end-of-stream has been received
    /// (either now or in a previous call).
    pub fn recv(&mut self) -> WorkResult<T> {
        if self.eos {
            return Err(WorkError::Shutdown);
        }
        match self.receiver.recv() {
            Ok(ChannelMessage::Chunk(item)) => Ok(item),
            Ok(ChannelMessage::EndOfStream) => {
                self.eos = true;
                tracing::debug!("Receiver::recv() - EndOfStream received");
                Err(WorkError::Shutdown)
            }
            Err(_) => {
                self.eos = true;
                tracing::debug!("Receiver::recv() - channel disconnected, returning Shutdown");
                Err(WorkError::Shutdown)
            }
        }
    }
}

/// Bounded channel pair carrying [`ChannelMessage`]s
pub fn channel<T>(capacity: usize) -> (super::Sender<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (super::Sender::new(tx), Receiver::new(rx))
}
