//! Helpers for testing the crate.

use std::collections::HashSet;

use crate::bus::Bus;
use crate::region::{EEPROM, PAGE_FLASH};
use crate::registers::{ee_dyn, EECTRL_BASE, EE_DYN, EE_STAT_COD, EE_STAT_DAT};

/// Backing store covers the stub RAM, the EECTRL block and both memories
/// (including the disputed flash tail, so out-of-range accesses still panic
/// with a useful message instead of slicing garbage).
const MOCK_BASE: u32 = 0x0010_0000;
const MOCK_END: u32 = 0x0023_0000;

/// Byte value of an erased NVM cell.
const ERASED: u8 = 0xFF;

/// RAM-backed model of the target: memories, stub RAM and just enough
/// EECTRL behaviour to be dangerous.
///
/// The part that matters is the flash page latch: every byte written into
/// the flash range is tracked, and a program pulse blanks all bytes of the
/// touched pages that were *not* rewritten since the previous pulse. That is
/// exactly the erase-before-write hazard the engines' merge logic exists
/// for, so a dropped merge shows up as corrupted data, not as a silently
/// passing test.
pub(crate) struct MockNvm {
    mem: Vec<u8>,
    /// Flash bytes written since the last program pulse.
    touched: HashSet<u32>,
    /// EEPROM program pulses observed.
    pub eeprom_pulses: u32,
    /// Flash (both banks) program pulses observed.
    pub flash_pulses: u32,
    /// Reset trigger bits observed, each counted once.
    pub resets: u32,
    /// Bus writes that landed at or above the EECTRL block, any width.
    pub nvm_writes: u64,
    /// Raise the EEPROM high-voltage fault on every pulse.
    pub hv_error_dat: bool,
    /// Raise a bank high-voltage fault on every flash pulse.
    pub hv_error_cod: bool,
    /// Writes to this byte address are dropped, like a worn-out cell.
    pub stuck_addr: Option<u32>,
}

impl MockNvm {
    pub(crate) fn new() -> Self {
        let mut mem = vec![0u8; (MOCK_END - MOCK_BASE) as usize];
        for region in [EEPROM, PAGE_FLASH] {
            let start = (region.base - MOCK_BASE) as usize;
            let len = (region.page_count * region.page_size) as usize;
            mem[start..start + len].fill(ERASED);
        }
        Self {
            mem,
            touched: HashSet::new(),
            eeprom_pulses: 0,
            flash_pulses: 0,
            resets: 0,
            nvm_writes: 0,
            hv_error_dat: false,
            hv_error_cod: false,
            stuck_addr: None,
        }
    }

    /// Pre-load memory, bypassing the counters and the page latch: the data
    /// behaves as committed cell content.
    pub(crate) fn load(&mut self, addr: u32, data: &[u8]) {
        for (offset, &byte) in data.iter().enumerate() {
            let index = self.index_of(addr + offset as u32);
            self.mem[index] = byte;
        }
    }

    /// Committed content of an address range.
    pub(crate) fn bytes(&self, addr: u32, len: u32) -> Vec<u8> {
        let start = self.index_of(addr);
        self.mem[start..start + len as usize].to_vec()
    }

    fn index_of(&self, addr: u32) -> usize {
        assert!(
            (MOCK_BASE..MOCK_END).contains(&addr),
            "no backing memory at {addr:#010x}"
        );
        (addr - MOCK_BASE) as usize
    }

    fn store(&mut self, addr: u32, value: u8) {
        if addr >= EECTRL_BASE {
            self.nvm_writes += 1;
        }
        if self.stuck_addr == Some(addr) {
            return;
        }
        if PAGE_FLASH.contains(addr) {
            self.touched.insert(addr);
        }
        let index = self.index_of(addr);
        self.mem[index] = value;
    }

    fn store_raw_u32(&mut self, addr: u32, value: u32) {
        let index = self.index_of(addr);
        self.mem[index..index + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn trigger(&mut self, bits: u32) {
        if bits & ee_dyn::PROG_DAT != 0 {
            self.eeprom_pulses += 1;
            let stat = if self.hv_error_dat { 1 << 2 } else { 0 };
            self.store_raw_u32(EE_STAT_DAT.addr, stat);
        }
        if bits & (ee_dyn::PROG_0_COD | ee_dyn::PROG_1_COD) != 0 {
            self.flash_pulses += 1;
            self.commit_flash_pulse();
            let stat = if self.hv_error_cod { 1 << 2 } else { 0 };
            self.store_raw_u32(EE_STAT_COD.addr, stat);
        }
        let reset_bits = ee_dyn::EE_RST_DAT | ee_dyn::EE_RST_0_COD | ee_dyn::EE_RST_1_COD;
        self.resets += (bits & reset_bits).count_ones();
    }

    /// Program every page with latched (touched) bytes; anything in those
    /// pages that was not rewritten comes out erased.
    fn commit_flash_pulse(&mut self) {
        let pages: HashSet<u32> = self
            .touched
            .iter()
            .map(|&addr| PAGE_FLASH.page_start(addr))
            .collect();
        for page_start in pages {
            for addr in page_start..page_start + PAGE_FLASH.page_size {
                if !self.touched.contains(&addr) {
                    let index = self.index_of(addr);
                    self.mem[index] = ERASED;
                }
            }
        }
        self.touched.clear();
    }
}

impl Bus for MockNvm {
    fn read_u8(&mut self, addr: u32) -> u8 {
        let index = self.index_of(addr);
        self.mem[index]
    }

    fn read_u16(&mut self, addr: u32) -> u16 {
        u16::from_le_bytes([self.read_u8(addr), self.read_u8(addr + 1)])
    }

    fn read_u32(&mut self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.read_u8(addr),
            self.read_u8(addr + 1),
            self.read_u8(addr + 2),
            self.read_u8(addr + 3),
        ])
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.store(addr, value);
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.store(addr + offset as u32, byte);
        }
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        if addr == EE_DYN.addr {
            self.nvm_writes += 1;
            self.trigger(value);
            return;
        }
        for (offset, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.store(addr + offset as u32, byte);
        }
    }
}
