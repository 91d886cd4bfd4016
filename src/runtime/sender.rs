//! Chunk sender with explicit end-of-stream signaling

use crossbeam_channel::{SendError, Sender as CrossbeamSender};

/// Channel message wrapper for end-of-stream signaling
///
/// Sources signal explicitly when no more data will follow, so the consumer
/// can tell a finished capture from a reader thread that died.
///
/// Consumers never see this enum directly: `Sender::send()` wraps values in
/// `Chunk(T)` and `Receiver::recv()` unwraps them.
#[derive(Clone, Debug)]
pub enum ChannelMessage<T> {
    /// A chunk of data
    Chunk(T),
    /// End-of-stream marker, no more data will be sent
    EndOfStream,
}

/// Sending half of a source channel
pub struct Sender<T> {
    destination: CrossbeamSender<ChannelMessage<T>>,
}

impl<T> Sender<T> {
    pub fn new(destination: CrossbeamSender<ChannelMessage<T>>) -> Self {
        Self { destination }
    }

    /// Send one value, blocking while the channel is full
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        // Extract the inner value from the ChannelMessage for the error
        if let Err(SendError(ChannelMessage::Chunk(v))) =
            self.destination.send(ChannelMessage::Chunk(value))
        {
            return Err(SendError(v));
        }
        Ok(())
    }

    /// Signal end-of-stream
    ///
    /// The downstream `Receiver` returns `WorkError::Shutdown` on every
    /// subsequent `recv()`.
    pub fn close(&self) {
        let _ = self.destination.send(ChannelMessage::EndOfStream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_wraps_chunks() {
        let (tx, rx) = crossbeam_channel::bounded(2);
        let sender = Sender::new(tx);
        sender.send(vec![1u8, 2]).unwrap();
        sender.close();

        assert!(matches!(rx.recv().unwrap(), ChannelMessage::Chunk(v) if v == vec![1, 2]));
        assert!(matches!(rx.recv().unwrap(), ChannelMessage::EndOfStream));
    }

    #[test]
    fn test_send_to_dropped_receiver_returns_value() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let sender = Sender::new(tx);
        let SendError(value) = sender.send(7u8).unwrap_err();
        assert_eq!(value, 7);
    }
}
