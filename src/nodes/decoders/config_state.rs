//! Shadow copy of the CC1101 configuration registers
//!
//! `current` holds the last value seen written to each register. A burst
//! write lands in `staging` first; only when the burst is complete is it
//! compared against `current` and the differing registers committed.

use super::registers::{CHANNR, NUM_REGISTERS, SYNC0, SYNC1};
use super::types::RegisterChange;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRegisterImage {
    current: [u8; NUM_REGISTERS],
    staging: [u8; NUM_REGISTERS],
}

impl Default for ConfigRegisterImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRegisterImage {
    /// Both images start zeroed; the real power-on values are unknown
    pub fn new() -> Self {
        Self {
            current: [0; NUM_REGISTERS],
            staging: [0; NUM_REGISTERS],
        }
    }

    pub fn current(&self, regnum: u8) -> u8 {
        self.current[index(regnum)]
    }

    /// Single-register write goes straight to `current`
    pub fn commit(&mut self, regnum: u8, value: u8) {
        self.current[index(regnum)] = value;
    }

    /// Buffer one byte of a burst write
    pub fn stage(&mut self, regnum: u8, value: u8) {
        self.staging[index(regnum)] = value;
    }

    /// Commit a finished burst over `range`, returning the registers that changed
    pub fn apply_staged(&mut self, range: Range<u8>) -> Vec<RegisterChange> {
        let mut changes = Vec::new();
        for regnum in range {
            let i = index(regnum);
            if self.staging[i] != self.current[i] {
                changes.push(RegisterChange {
                    regnum,
                    old: self.current[i],
                    new: self.staging[i],
                });
                self.current[i] = self.staging[i];
            }
        }
        changes
    }

    pub fn channel(&self) -> u8 {
        self.current(CHANNR)
    }

    /// SYNC1, SYNC0
    pub fn sync_word(&self) -> [u8; 2] {
        [self.current(SYNC1), self.current(SYNC0)]
    }
}

fn index(regnum: u8) -> usize {
    usize::from(regnum) % NUM_REGISTERS
}
