//! Page-flash write engine.
//!
//! Two physical banks sit behind one address range and are always programmed
//! in lockstep: every pulse raises both banks' trigger bits and completion
//! means both busy bits are clear. The crucial difference from the EEPROM is
//! that flash cells are erased at page granularity when the pulse fires, so
//! every 4-byte slot of a 128-byte page that is not being overwritten must
//! be read and written back in place, or it comes out blank. That merge
//! happens once per page, not per byte.
//!
//! Caller contract (unchecked, as in the EEPROM engine): destination 4-byte
//! aligned, length a non-zero multiple of 4.

use crate::bus::Bus;
use crate::delay::Delay;
use crate::region::PAGE_FLASH;
use crate::registers::{ee_dyn, EeStatCod, ProgramPulse, EE_DYN, EE_STAT_COD};
use crate::status::Status;

/// Wait between firing the program trigger and the first busy poll.
const PROG_PREPOLL_US: u32 = 10;

/// Trigger/poll protocol covering both banks.
const PULSE: ProgramPulse = ProgramPulse {
    trigger: ee_dyn::PROG_0_COD | ee_dyn::PROG_1_COD,
    status: EE_STAT_COD,
    busy: |raw| {
        let stat = EeStatCod::from(raw);
        stat.prog_0_cod() || stat.prog_1_cod()
    },
    hv_error: |raw| {
        let stat = EeStatCod::from(raw);
        stat.hverr_0_cod() || stat.hverr_1_cod()
    },
    prepoll_us: PROG_PREPOLL_US,
};

/// Where the in-range slots of a merged page take their data from.
enum Source<'a> {
    Slice(&'a [u8]),
    Bus(u32),
    Pattern(u32),
}

impl Source<'_> {
    fn word(&self, bus: &mut impl Bus, offset: u32) -> u32 {
        match *self {
            Source::Slice(data) => {
                let i = offset as usize;
                u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
            }
            Source::Bus(addr) => bus.read_u32(addr + offset),
            Source::Pattern(pattern) => pattern,
        }
    }
}

/// Page-flash write engine over a memory bus.
pub struct PageFlash<'b, B: Bus> {
    bus: &'b mut B,
    delay: Delay,
}

impl<'b, B: Bus> PageFlash<'b, B> {
    /// Attach the engine to a bus with a calibrated delay.
    pub fn new(bus: &'b mut B, delay: Delay) -> Self {
        Self { bus, delay }
    }

    /// Write `data` starting at `dest`, merging the untouched remainder of
    /// every partially covered 128-byte page.
    pub fn write_buffer(&mut self, data: &[u8], dest: u32) -> Result<(), Status> {
        self.merge_runs(Source::Slice(data), dest, data.len() as u32)
    }

    /// Same engine with the source read through the bus.
    pub fn write_from(&mut self, src: u32, dest: u32, len: u32) -> Result<(), Status> {
        self.merge_runs(Source::Bus(src), dest, len)
    }

    /// Fill `len` bytes from `dest` with a repeating 32-bit pattern, without
    /// requiring the caller to materialize a buffer.
    pub fn fill_region(&mut self, dest: u32, len: u32, pattern: u32) -> Result<(), Status> {
        self.merge_runs(Source::Pattern(pattern), dest, len)
    }

    /// Write one 32-bit word.
    pub fn write_double_word(&mut self, value: u32, dest: u32) -> Result<(), Status> {
        self.write_buffer(&value.to_le_bytes(), dest)
    }

    /// Write one full 128-byte page. The whole page is the target, so there
    /// is nothing to merge.
    pub fn write_page(&mut self, page_number: u32, data: &[u8; 128]) -> Result<(), Status> {
        let mut addr = PAGE_FLASH.page_address(page_number);
        PULSE.wait_ready(self.bus)?;
        for chunk in data.chunks_exact(4) {
            self.bus
                .write_u32(addr, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            addr += 4;
        }
        PULSE.fire(self.bus, &self.delay)
    }

    /// Reset both bank controllers. Fire-and-forget: there is no status to
    /// observe, so this cannot be seen to fail.
    pub fn hw_reset(&mut self) {
        EE_DYN.pulse(self.bus, ee_dyn::EE_RST_0_COD);
        EE_DYN.pulse(self.bus, ee_dyn::EE_RST_1_COD);
    }

    fn merge_runs(&mut self, source: Source<'_>, dest: u32, len: u32) -> Result<(), Status> {
        if len == 0 {
            return Ok(());
        }
        PULSE.wait_ready(self.bus)?;

        let start = dest;
        let end = dest + len - 1;
        let mut cursor = start;
        let mut remaining = len;
        while remaining > 0 {
            let page_start = PAGE_FLASH.page_start(cursor);
            let page_end = page_start + PAGE_FLASH.page_size - 1;

            let mut slot = page_start;
            while slot <= page_end {
                if slot >= start && slot <= end {
                    let value = source.word(self.bus, slot - start);
                    self.bus.write_u32(slot, value);
                    remaining -= 4;
                } else {
                    // Rewrite the untouched slot so the program pulse does
                    // not erase it along with the rest of the page.
                    let current = self.bus.read_u32(slot);
                    self.bus.write_u32(slot, current);
                }
                slot += 4;
            }

            PULSE.fire(self.bus, &self.delay)?;
            cursor = page_end + 1;
        }
        Ok(())
    }
}
