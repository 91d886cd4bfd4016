//! Transaction classification from the header byte
//!
//! The first master byte of a CC1101 transaction is
//! `R/W̅ (bit 7) | BURST (bit 6) | ADDRESS (bits 5..0)`.

use super::registers::{FIFO, LAST_STROBE, PATABLE, STROBE_BASE};
use super::types::{Access, Direction, FatalKind};

/// Decoded header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub is_read: bool,
    pub is_burst: bool,
    pub regnum: u8,
}

impl From<u8> for Header {
    fn from(master: u8) -> Self {
        Self {
            is_read: master & 0x80 != 0,
            is_burst: master & 0x40 != 0,
            regnum: master & 0x3F,
        }
    }
}

impl Header {
    pub fn access(&self) -> Access {
        if self.is_read {
            Access::Read
        } else {
            Access::Write
        }
    }
}

/// What a transaction targets and how its data bytes must be framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Command strobe; no data bytes, direction irrelevant
    Strobe(u8),
    /// One PA table byte
    TableSingle(Access),
    /// PA table bytes until chip select is released
    TableBurst(Access),
    /// FIFO bytes until chip select is released, forming one packet
    FifoBurst(Direction),
    /// Configuration or status register, one byte or auto-incrementing burst
    Register {
        access: Access,
        burst: bool,
        regnum: u8,
    },
    /// A shape never seen in valid traffic
    Unsupported(FatalKind),
}

impl Transaction {
    /// Fatal fault if this transaction starts without chip select asserted
    ///
    /// Framing of table and FIFO bursts depends on chip select; everything
    /// else only warns.
    pub fn select_fault(&self) -> Option<FatalKind> {
        match self {
            Transaction::TableBurst(_) => Some(FatalKind::TableNotSelected),
            Transaction::FifoBurst(Direction::Received) => Some(FatalKind::RxFifoNotSelected),
            Transaction::FifoBurst(Direction::Sent) => Some(FatalKind::TxFifoNotSelected),
            _ => None,
        }
    }
}

/// Classify a transaction by its header byte; rules apply in order
pub fn classify(header: Header) -> Transaction {
    let Header {
        is_read,
        is_burst,
        regnum,
    } = header;

    if (STROBE_BASE..=LAST_STROBE).contains(&regnum) && !is_burst {
        return Transaction::Strobe(regnum);
    }
    if regnum == PATABLE {
        return if is_burst {
            Transaction::TableBurst(header.access())
        } else {
            Transaction::TableSingle(header.access())
        };
    }
    if regnum == FIFO {
        return match (is_read, is_burst) {
            (true, true) => Transaction::FifoBurst(Direction::Received),
            (false, true) => Transaction::FifoBurst(Direction::Sent),
            (true, false) => Transaction::Unsupported(FatalKind::SingleRxFifoRead),
            (false, false) => Transaction::Unsupported(FatalKind::SingleTxFifoWrite),
        };
    }
    Transaction::Register {
        access: header.access(),
        burst: is_burst,
        regnum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_byte(master: u8) -> Transaction {
        classify(Header::from(master))
    }

    #[test]
    fn test_header_bits() {
        let header = Header::from(0xCA);
        assert!(header.is_read);
        assert!(header.is_burst);
        assert_eq!(header.regnum, 0x0A);
        assert_eq!(header.access(), Access::Read);
    }

    #[test]
    fn test_strobes_ignore_direction() {
        assert_eq!(classify_byte(0x30), Transaction::Strobe(0x30));
        assert_eq!(classify_byte(0xB4), Transaction::Strobe(0x34));
        assert_eq!(classify_byte(0x3D), Transaction::Strobe(0x3D));
    }

    #[test]
    fn test_burst_status_read_is_a_register_access() {
        assert_eq!(
            classify_byte(0xF5),
            Transaction::Register {
                access: Access::Read,
                burst: true,
                regnum: 0x35
            }
        );
    }

    #[test]
    fn test_power_table() {
        assert_eq!(classify_byte(0x3E), Transaction::TableSingle(Access::Write));
        assert_eq!(classify_byte(0xBE), Transaction::TableSingle(Access::Read));
        assert_eq!(classify_byte(0x7E), Transaction::TableBurst(Access::Write));
        assert_eq!(classify_byte(0xFE), Transaction::TableBurst(Access::Read));
    }

    #[test]
    fn test_fifo() {
        assert_eq!(classify_byte(0xFF), Transaction::FifoBurst(Direction::Received));
        assert_eq!(classify_byte(0x7F), Transaction::FifoBurst(Direction::Sent));
        assert_eq!(
            classify_byte(0xBF),
            Transaction::Unsupported(FatalKind::SingleRxFifoRead)
        );
        assert_eq!(
            classify_byte(0x3F),
            Transaction::Unsupported(FatalKind::SingleTxFifoWrite)
        );
    }

    #[test]
    fn test_config_registers() {
        assert_eq!(
            classify_byte(0x0A),
            Transaction::Register {
                access: Access::Write,
                burst: false,
                regnum: 0x0A
            }
        );
        assert_eq!(
            classify_byte(0x40),
            Transaction::Register {
                access: Access::Write,
                burst: true,
                regnum: 0x00
            }
        );
    }

    #[test]
    fn test_select_faults() {
        assert_eq!(
            classify_byte(0x7F).select_fault(),
            Some(FatalKind::TxFifoNotSelected)
        );
        assert_eq!(
            classify_byte(0xFF).select_fault(),
            Some(FatalKind::RxFifoNotSelected)
        );
        assert_eq!(
            classify_byte(0x7E).select_fault(),
            Some(FatalKind::TableNotSelected)
        );
        assert_eq!(classify_byte(0x0A).select_fault(), None);
        assert_eq!(classify_byte(0x36).select_fault(), None);
    }
}
