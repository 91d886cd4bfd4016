//! Packet reassembly from FIFO bursts
//!
//! One packet is open at a time. Bytes beyond the payload cap are still
//! counted so the record can report the truncation.

use super::config_state::ConfigRegisterImage;
use super::types::{Direction, PacketRecord};

/// Largest payload kept for one packet
pub const MAX_PACKET: usize = 100;

#[derive(Debug)]
pub struct PacketAssembler {
    max_len: usize,
    /// Microseconds since the previous packet record
    elapsed_us: u64,
    direction: Direction,
    data: Vec<u8>,
    total_bytes: usize,
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new(MAX_PACKET)
    }
}

impl PacketAssembler {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.clamp(1, MAX_PACKET);
        Self {
            max_len,
            elapsed_us: 0,
            direction: Direction::Received,
            data: Vec::with_capacity(max_len),
            total_bytes: 0,
        }
    }

    /// Payload bytes held so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn add_elapsed(&mut self, micros: u64) {
        self.elapsed_us = self.elapsed_us.saturating_add(micros);
    }

    /// Start collecting a packet travelling in `direction`
    pub fn begin(&mut self, direction: Direction) {
        self.direction = direction;
        self.data.clear();
        self.total_bytes = 0;
    }

    /// Add one FIFO byte; returns false if it fell beyond the cap
    pub fn push(&mut self, byte: u8) -> bool {
        self.total_bytes += 1;
        if self.data.len() < self.max_len {
            self.data.push(byte);
            true
        } else {
            false
        }
    }

    /// Close the packet, stamping it with channel and sync word from `image`
    pub fn finish(&mut self, image: &ConfigRegisterImage) -> PacketRecord {
        let record = PacketRecord {
            elapsed_us: std::mem::take(&mut self.elapsed_us),
            direction: self.direction,
            data: std::mem::take(&mut self.data),
            total_bytes: std::mem::take(&mut self.total_bytes),
            channel: image.channel(),
            sync: image.sync_word(),
        };
        self.data.reserve(self.max_len);
        record
    }

    /// Zero-length record marking a chip reset
    pub fn reset_marker(&mut self, image: &ConfigRegisterImage) -> PacketRecord {
        self.begin(self.direction);
        self.finish(image)
    }

    /// Time since the previous packet record, restarting the count
    pub fn take_elapsed(&mut self) -> u64 {
        std::mem::take(&mut self.elapsed_us)
    }

    /// Drop a partial packet; elapsed time keeps accumulating
    pub fn abandon(&mut self) {
        self.data.clear();
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_collects_bytes_in_order() {
        let mut image = ConfigRegisterImage::new();
        image.commit(0x0A, 0x11);
        image.commit(0x04, 0xD3);
        image.commit(0x05, 0x91);

        let mut packet = PacketAssembler::default();
        packet.add_elapsed(1_500_000);
        packet.begin(Direction::Sent);
        for byte in [1, 2, 3] {
            assert!(packet.push(byte));
        }
        let record = packet.finish(&image);

        assert_eq!(record.elapsed_us, 1_500_000);
        assert_eq!(record.direction, Direction::Sent);
        assert_eq!(record.data, vec![1, 2, 3]);
        assert_eq!(record.total_bytes, 3);
        assert_eq!(record.channel, 0x11);
        assert_eq!(record.sync, [0xD3, 0x91]);

        // reset after emission
        assert!(packet.is_empty());
        assert_eq!(packet.take_elapsed(), 0);
    }

    #[test]
    fn test_packet_truncates_at_cap() {
        let image = ConfigRegisterImage::new();
        let mut packet = PacketAssembler::default();
        packet.begin(Direction::Received);
        for i in 0..(MAX_PACKET + 5) {
            packet.push(i as u8);
        }
        assert_eq!(packet.len(), MAX_PACKET);
        assert_eq!(packet.total_bytes(), MAX_PACKET + 5);

        let record = packet.finish(&image);
        assert_eq!(record.len(), MAX_PACKET);
        assert!(record.is_truncated());
        assert_eq!(record.data[MAX_PACKET - 1], (MAX_PACKET - 1) as u8);
    }

    #[test]
    fn test_reset_marker_is_empty() {
        let image = ConfigRegisterImage::new();
        let mut packet = PacketAssembler::default();
        packet.add_elapsed(42);
        let record = packet.reset_marker(&image);
        assert!(record.is_reset());
        assert_eq!(record.elapsed_us, 42);
    }

    #[test]
    fn test_abandon_keeps_elapsed() {
        let mut packet = PacketAssembler::new(4);
        packet.add_elapsed(7);
        packet.begin(Direction::Sent);
        packet.push(9);
        packet.abandon();
        assert!(packet.is_empty());
        assert_eq!(packet.take_elapsed(), 7);
    }

    #[test]
    fn test_cap_is_clamped() {
        let mut packet = PacketAssembler::new(0);
        packet.begin(Direction::Sent);
        assert!(packet.push(1));
        assert!(!packet.push(2));
    }
}
