//! CC1101 register and command strobe catalog
//!
//! Static name/description tables for the 64 register addresses
//! (0x00–0x3F) and the 16 command strobe addresses (0x30–0x3F). A handful
//! of registers carry a [`DecodeRule`] that renders a value in words; the
//! rest are shown as raw hex only.
//!
//! The strobe range overlaps the status registers: a non-burst access to
//! 0x30–0x3D is a strobe, a burst read of the same address is a status read.

/// Number of addressable registers, indexed by the low 6 bits of the header byte
pub const NUM_REGISTERS: usize = 64;

pub const IOCFG2: u8 = 0x00;
pub const IOCFG1: u8 = 0x01;
pub const IOCFG0: u8 = 0x02;
pub const SYNC1: u8 = 0x04;
pub const SYNC0: u8 = 0x05;
pub const CHANNR: u8 = 0x0A;

/// Last register that a burst write may touch
pub const LAST_WRITABLE: u8 = 0x2E;

/// First command strobe / status register address
pub const STROBE_BASE: u8 = 0x30;
/// Last address decoded as a strobe (0x3E and 0x3F are PATABLE and FIFO)
pub const LAST_STROBE: u8 = 0x3D;

pub const SRES: u8 = 0x30;
pub const SRX: u8 = 0x34;

pub const PATABLE: u8 = 0x3E;
pub const FIFO: u8 = 0x3F;

/// How a register value is rendered beyond its raw hex byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeRule {
    /// Raw value only
    Raw,
    /// GDO pin function select, bits 5..0 index [`GDO_SIGNALS`]
    Gdo(GdoPin),
}

/// The three GDO configuration registers differ only in what bit 7 means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdoPin {
    /// IOCFG2: bit 7 unused
    Gdo2,
    /// IOCFG1: bit 7 selects high drive strength for all GDO pins
    Gdo1,
    /// IOCFG0: bit 7 enables the analog temperature sensor
    Gdo0,
}

impl DecodeRule {
    /// Describe `value` in words, or `None` when the register has no decoder
    pub fn describe(&self, value: u8) -> Option<String> {
        match self {
            DecodeRule::Raw => None,
            DecodeRule::Gdo(pin) => Some(pin.describe(value)),
        }
    }
}

impl GdoPin {
    fn describe(&self, value: u8) -> String {
        let mut text = String::new();
        if value & 0x80 != 0 {
            match self {
                GdoPin::Gdo2 => {}
                GdoPin::Gdo1 => text.push_str("high GDO output strength, "),
                GdoPin::Gdo0 => text.push_str("enable temp sensor, "),
            }
        }
        if value & 0x40 != 0 {
            text.push_str("inverted ");
        }
        text.push_str(GDO_SIGNALS[usize::from(value & 0x3F)]);
        text
    }
}

/// Immutable description of one register address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub rule: DecodeRule,
}

impl RegisterDescriptor {
    const fn raw(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            rule: DecodeRule::Raw,
        }
    }

    const fn gdo(name: &'static str, description: &'static str, pin: GdoPin) -> Self {
        Self {
            name,
            description,
            rule: DecodeRule::Gdo(pin),
        }
    }

    /// Render `value` through this register's decode rule
    pub fn describe(&self, value: u8) -> Option<String> {
        self.rule.describe(value)
    }
}

/// Immutable description of one command strobe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrobeDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

impl StrobeDescriptor {
    const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// Look up a register by number; only the low 6 bits are significant
pub fn register(regnum: u8) -> &'static RegisterDescriptor {
    &REGISTERS[usize::from(regnum & 0x3F)]
}

/// Look up a command strobe by register number (0x30–0x3F)
pub fn strobe(regnum: u8) -> Option<&'static StrobeDescriptor> {
    regnum
        .checked_sub(STROBE_BASE)
        .and_then(|index| STROBES.get(usize::from(index)))
}

/// Signal selection for IOCFGx bits 5..0 (CC1101 datasheet, table 41)
pub static GDO_SIGNALS: [&str; 64] = [
    "RX FIFO filled",
    "RX FIFO filled, or end of packet",
    "TX FIFO filled",
    "TX FIFO full",
    "RX FIFO overflow",
    "TX FIFO underflow",
    "sync word sent/rcvd",
    "packet received",
    "preamble quality reached",
    "clear channel assessment",
    "PLL lock detected",
    "serial clock",
    "serial sync data out",
    "serial data out",
    "carrier sense",
    "CRC ok",
    "?",
    "?",
    "?",
    "?",
    "?",
    "?",
    "RX hard data 1",
    "RX hard data 0",
    "?",
    "?",
    "?",
    "PA_PD",
    "LNA_PD",
    "RX_SYMBOL_TICK",
    "?",
    "?",
    "?",
    "?",
    "?",
    "?",
    "WOR_EVNT0",
    "WOR_EVNT1",
    "CLK_256",
    "CLK_32k",
    "?",
    "CHIP_RDYn",
    "?",
    "XOSC stable",
    "?",
    "?",
    "high impedance",
    "hardwired to 0",
    "CLK_XOSC/1",
    "CLK_XOSC/1.5",
    "CLK_XOSC/2",
    "CLK_XOSC/3",
    "CLK_XOSC/4",
    "CLK_XOSC/6",
    "CLK_XOSC/8",
    "CLK_XOSC/12",
    "CLK_XOSC/16",
    "CLK_XOSC/24",
    "CLK_XOSC/32",
    "CLK_XOSC/48",
    "CLK_XOSC/64",
    "CLK_XOSC/96",
    "CLK_XOSC/128",
    "CLK_XOSC/192",
];

pub static REGISTERS: [RegisterDescriptor; NUM_REGISTERS] = [
    RegisterDescriptor::gdo("IOCFG2", "GDO2 output pin config", GdoPin::Gdo2),
    RegisterDescriptor::gdo("IOCFG1", "GDO1 output pin config", GdoPin::Gdo1),
    RegisterDescriptor::gdo("IOCFG0", "GDO0 output pin config", GdoPin::Gdo0),
    RegisterDescriptor::raw("FIFOTHR", "FIFO thresholds"),
    RegisterDescriptor::raw("SYNC1", "sync word high"),
    RegisterDescriptor::raw("SYNC0", "sync word low"),
    RegisterDescriptor::raw("PKTLEN", "packet length"),
    RegisterDescriptor::raw("PKTCTRL1", "packet control 1"),
    RegisterDescriptor::raw("PKTCTRL0", "packet control 0"),
    RegisterDescriptor::raw("ADDR", "device address"),
    RegisterDescriptor::raw("CHANNR", "channel number"),
    RegisterDescriptor::raw("FSCTRL1", "frequency synthesizer control 1"),
    RegisterDescriptor::raw("FSCTRL0", "frequency synthesizer control 0"),
    RegisterDescriptor::raw("FREQ2", "frequency control word H"),
    RegisterDescriptor::raw("FREQ1", "frequency control word M"),
    RegisterDescriptor::raw("FREQ0", "frequency control word L"),
    RegisterDescriptor::raw("MDMCFG4", "modem config 4"),
    RegisterDescriptor::raw("MDMCFG3", "modem config 3"),
    RegisterDescriptor::raw("MDMCFG2", "modem config 2"),
    RegisterDescriptor::raw("MDMCFG1", "modem config 1"),
    RegisterDescriptor::raw("MDMCFG0", "modem config 0"),
    RegisterDescriptor::raw("DEVIATN", "modem deviation setting"),
    RegisterDescriptor::raw("MCSM2", "main radio state machine config 2"),
    RegisterDescriptor::raw("MCSM1", "main radio state machine config 1"),
    RegisterDescriptor::raw("MCSM0", "main radio state machine config 0"),
    RegisterDescriptor::raw("FOCCFG", "frequency offset compensation config"),
    RegisterDescriptor::raw("BSCFG", "bit sync config"),
    RegisterDescriptor::raw("AGCCTRL2", "AGC control 2"),
    RegisterDescriptor::raw("AGCCTRL1", "AGC control 1"),
    RegisterDescriptor::raw("AGCCTRL0", "AGC control 0"),
    RegisterDescriptor::raw("WOREVT1", "event 0 timeout H"),
    RegisterDescriptor::raw("WOREVT0", "event 0 timeout L"),
    RegisterDescriptor::raw("WORCTRL", "wake on radio control"),
    RegisterDescriptor::raw("FREND1", "front end RX config"),
    RegisterDescriptor::raw("FREND0", "front end TX config"),
    RegisterDescriptor::raw("FSCAL3", "frequency synthesizer calibration 3"),
    RegisterDescriptor::raw("FSCAL2", "frequency synthesizer calibration 2"),
    RegisterDescriptor::raw("FSCAL1", "frequency synthesizer calibration 1"),
    RegisterDescriptor::raw("FSCAL0", "frequency synthesizer calibration 0"),
    RegisterDescriptor::raw("RCCTRL1", "RC oscillator config 1"),
    RegisterDescriptor::raw("RCCTRL0", "RC oscillator config 0"),
    RegisterDescriptor::raw("FSTEST", "frequency synthesizer calibration control"),
    RegisterDescriptor::raw("PTEST", "production test"),
    RegisterDescriptor::raw("AGCTEST", "AGC test"),
    RegisterDescriptor::raw("TEST2", "test settings 2"),
    RegisterDescriptor::raw("TEST1", "test settings 1"),
    RegisterDescriptor::raw("TEST0", "test settings 0"),
    RegisterDescriptor::raw("UNUSED 0x2F", ""),
    RegisterDescriptor::raw("PARTNUM", "part number"),
    RegisterDescriptor::raw("VERSION", "version number"),
    RegisterDescriptor::raw("FREQEST", "frequency offset estimate"),
    RegisterDescriptor::raw("LQI", "demodulator estimate for link quality"),
    RegisterDescriptor::raw("RSSI", "received signal strength"),
    RegisterDescriptor::raw("MARCSTATE", "control machine state"),
    RegisterDescriptor::raw("WORTIME1", "WOR timer H"),
    RegisterDescriptor::raw("WORTIME0", "WOR timer L"),
    RegisterDescriptor::raw("PKTSTATUS", "GDOx and packet status"),
    RegisterDescriptor::raw("VCO_VC_DAC", "PLL calibration module setting"),
    RegisterDescriptor::raw("TXBYTES", "underflow, and #bytes in TX FIFO"),
    RegisterDescriptor::raw("RXBYTES", "overflow, and #bytes in RX FIFO"),
    RegisterDescriptor::raw("RCCTRL1_STATUS", "RC oscillator calibration result 1"),
    RegisterDescriptor::raw("RCCTRL0_STATUS", "RC oscillator calibration result 0"),
    RegisterDescriptor::raw("PATABLE", "power amp control"),
    RegisterDescriptor::raw("FIFO", "data"),
];

pub static STROBES: [StrobeDescriptor; 16] = [
    StrobeDescriptor::new("SRES", "reset chip"),
    StrobeDescriptor::new("SFSTXON", "enable and calibrate"),
    StrobeDescriptor::new("SXOFF", "turn off oscillator"),
    StrobeDescriptor::new("SCAL", "calibrate synthesizer"),
    StrobeDescriptor::new("SRX", "enable RX"),
    StrobeDescriptor::new("STX", "enable TX"),
    StrobeDescriptor::new("SIDLE", "exit TX/RX"),
    StrobeDescriptor::new("UNUSED 0x37", ""),
    StrobeDescriptor::new("SWOR", "start RX polling (wake-on-radio)"),
    StrobeDescriptor::new("SPWD", "enter power down mode"),
    StrobeDescriptor::new("SFRX", "flush RX FIFO"),
    StrobeDescriptor::new("SFTX", "flush TX FIFO"),
    StrobeDescriptor::new("SWORRST", "reset real time clock to Event1"),
    StrobeDescriptor::new("SNOP", "no operation"),
    StrobeDescriptor::new("UNUSED 0x3E", ""),
    StrobeDescriptor::new("UNUSED 0x3F", ""),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_register_has_a_name() {
        for regnum in 0..=0x3Fu8 {
            assert!(
                !register(regnum).name.is_empty(),
                "register {:02X} has no name",
                regnum
            );
        }
    }

    #[test]
    fn test_every_strobe_has_a_name() {
        for regnum in STROBE_BASE..=0x3F {
            let descriptor = strobe(regnum);
            assert!(descriptor.is_some(), "strobe {:02X} missing", regnum);
            assert!(!descriptor.unwrap().name.is_empty());
        }
        assert!(strobe(0x2F).is_none());
        assert!(strobe(0x40).is_none());
    }

    #[test]
    fn test_well_known_entries() {
        assert_eq!(register(CHANNR).name, "CHANNR");
        assert_eq!(register(SYNC1).name, "SYNC1");
        assert_eq!(register(SYNC0).name, "SYNC0");
        assert_eq!(register(PATABLE).name, "PATABLE");
        assert_eq!(register(FIFO).name, "FIFO");
        assert_eq!(strobe(SRES).unwrap().name, "SRES");
        assert_eq!(strobe(SRX).unwrap().name, "SRX");
        assert_eq!(strobe(LAST_STROBE).unwrap().name, "SNOP");
    }

    #[test]
    fn test_register_lookup_masks_header_bits() {
        // 0xCA is a burst read of CHANNR
        assert_eq!(register(0xCA).name, "CHANNR");
    }

    #[test]
    fn test_raw_registers_have_no_description() {
        assert_eq!(register(CHANNR).describe(0x05), None);
    }

    #[test]
    fn test_gdo_decode() {
        assert_eq!(register(IOCFG2).describe(0x29).as_deref(), Some("CHIP_RDYn"));
        assert_eq!(
            register(IOCFG2).describe(0x46).as_deref(),
            Some("inverted sync word sent/rcvd")
        );
        assert_eq!(
            register(IOCFG1).describe(0xAE).as_deref(),
            Some("high GDO output strength, high impedance")
        );
        assert_eq!(
            register(IOCFG0).describe(0x80).as_deref(),
            Some("enable temp sensor, RX FIFO filled")
        );
        // IOCFG2 ignores bit 7
        assert_eq!(register(IOCFG2).describe(0xBF).as_deref(), Some("CLK_XOSC/192"));
    }
}
