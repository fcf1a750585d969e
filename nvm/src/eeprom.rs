//! EEPROM write engine.
//!
//! The EEPROM is memory mapped: staging data means writing it straight into
//! the destination addresses, which loads the controller's 64-byte page
//! latch; a trigger bit in `EE_DYN` then burns the latched page. Parameters
//! are deliberately unchecked: this code descends from mask ROM where every
//! byte counted, and the callers are the enforcement point for alignment
//! and range.

use crate::bus::Bus;
use crate::delay::Delay;
use crate::region::{EEPROM, SECURITY_ROW_LEN};
use crate::registers::{ee_dyn, EeStatDat, ProgramPulse, EE_DYN, EE_STAT_DAT};
use crate::status::Status;

/// Wait between firing the program trigger and the first busy poll. The
/// command takes at least 200 ns to latch; the page write itself runs
/// ~2.9 ms, so 10 µs adds nothing.
const PROG_PREPOLL_US: u32 = 10;

/// Trigger/poll protocol for the EEPROM page latch.
const PULSE: ProgramPulse = ProgramPulse {
    trigger: ee_dyn::PROG_DAT,
    status: EE_STAT_DAT,
    busy: |raw| EeStatDat::from(raw).prog_dat(),
    hv_error: |raw| EeStatDat::from(raw).hverr_dat(),
    prepoll_us: PROG_PREPOLL_US,
};

/// Where a staged write takes its bytes from.
enum Source<'a> {
    Slice(&'a [u8]),
    Bus(u32),
}

impl Source<'_> {
    fn byte(&self, bus: &mut impl Bus, index: u32) -> u8 {
        match *self {
            Source::Slice(data) => data[index as usize],
            Source::Bus(addr) => bus.read_u8(addr + index),
        }
    }
}

/// EEPROM write engine over a memory bus.
pub struct Eeprom<'b, B: Bus> {
    bus: &'b mut B,
    delay: Delay,
}

impl<'b, B: Bus> Eeprom<'b, B> {
    /// Attach the engine to a bus with a calibrated delay.
    pub fn new(bus: &'b mut B, delay: Delay) -> Self {
        Self { bus, delay }
    }

    /// Write `data` starting at `dest`.
    ///
    /// The transfer is split into runs bounded by 64-byte page boundaries;
    /// each run is staged byte-wise and burned with one program pulse.
    /// Returns on the first high-voltage error, leaving later runs unwritten.
    pub fn write_buffer(&mut self, data: &[u8], dest: u32) -> Result<(), Status> {
        self.write_runs(Source::Slice(data), dest, data.len() as u32)
    }

    /// Same engine with the source read through the bus. The source may sit
    /// in RAM or in the EEPROM itself.
    pub fn write_from(&mut self, src: u32, dest: u32, len: u32) -> Result<(), Status> {
        self.write_runs(Source::Bus(src), dest, len)
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, value: u8, dest: u32) -> Result<(), Status> {
        self.write_buffer(&[value], dest)
    }

    /// Write one 16-bit word.
    pub fn write_word(&mut self, value: u16, dest: u32) -> Result<(), Status> {
        self.write_buffer(&value.to_le_bytes(), dest)
    }

    /// Write one 32-bit word.
    pub fn write_double_word(&mut self, value: u32, dest: u32) -> Result<(), Status> {
        self.write_buffer(&value.to_le_bytes(), dest)
    }

    /// Fill `len` bytes from `dest` with a repeating 16-bit pattern, without
    /// requiring the caller to materialize a buffer. `dest` must be 2-byte
    /// aligned and `len` a multiple of 2.
    pub fn fill_region(&mut self, dest: u32, len: u32, pattern: u16) -> Result<(), Status> {
        PULSE.wait_ready(self.bus)?;
        let mut offset = 0;
        while offset < len {
            let run_end = EEPROM.page_end(dest + offset);
            while offset < len && dest + offset <= run_end {
                self.bus.write_u16(dest + offset, pattern);
                offset += 2;
            }
            PULSE.fire(self.bus, &self.delay)?;
        }
        Ok(())
    }

    /// Write one full 64-byte page.
    ///
    /// Page 0 leads with the security row: source and destination are
    /// advanced past it and only 60 bytes are written, so those four bytes
    /// can never be clobbered through this path.
    pub fn write_page(&mut self, page_number: u8, data: &[u8; 64]) -> Result<(), Status> {
        let mut addr = EEPROM.page_address(page_number as u32);
        let mut data: &[u8] = data;
        if page_number as u32 == EEPROM.start_page {
            addr += SECURITY_ROW_LEN;
            data = &data[SECURITY_ROW_LEN as usize..];
        }

        PULSE.wait_ready(self.bus)?;
        // 16-bit transfers halve the AHB transaction count.
        for chunk in data.chunks_exact(2) {
            self.bus.write_u16(addr, u16::from_le_bytes([chunk[0], chunk[1]]));
            addr += 2;
        }
        PULSE.fire(self.bus, &self.delay)
    }

    /// Unchecked read of one byte.
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        self.bus.read_u8(addr)
    }

    /// Unchecked read of one 16-bit word.
    pub fn read_word(&mut self, addr: u32) -> u16 {
        self.bus.read_u16(addr)
    }

    /// Reset the EEPROM controller. There is no status to observe; failure
    /// cannot be detected.
    pub fn hw_reset(&mut self) {
        EE_DYN.pulse(self.bus, ee_dyn::EE_RST_DAT);
    }

    fn write_runs(&mut self, source: Source<'_>, dest: u32, len: u32) -> Result<(), Status> {
        PULSE.wait_ready(self.bus)?;
        let mut offset = 0;
        while offset < len {
            let run_end = EEPROM.page_end(dest + offset);
            while offset < len && dest + offset <= run_end {
                let value = source.byte(self.bus, offset);
                self.bus.write_u8(dest + offset, value);
                offset += 1;
            }
            PULSE.fire(self.bus, &self.delay)?;
        }
        Ok(())
    }
}
