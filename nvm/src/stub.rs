//! Verify-and-retry entry routine: the payload a debug probe injects into
//! target RAM.
//!
//! There is no calling convention beyond "jump here". Parameters arrive
//! through a fixed RAM mailbox, the 0/1 verdict goes back through the same
//! mailbox, and a BKPT hands control back to the debugger.

use crate::bus::{self, Bus};
use crate::delay::Delay;
use crate::eeprom::Eeprom;
use crate::flash::PageFlash;
use crate::region::MemoryKind;
use crate::status::Status;

/// Start of the stub's working RAM; also the load address and entry point
/// of the injected image.
pub const RAM_START: u32 = 0x0010_0020;

/// Size of the working RAM handed to the stub.
pub const RAM_SIZE: u32 = 0x2E00;

/// The parameter/result mailbox sits just past the working area.
pub const MAILBOX_ADDR: u32 = RAM_START + RAM_SIZE;

/// Initial stack pointer the host sets before starting the stub.
pub const STACK_TOP: u32 = RAM_START + 0x2D00;

/// Iteration budget for the compare/write loop: three verify passes
/// interleaved with two write passes.
pub const RETRY_BUDGET: u32 = 5;

/// Host-filled parameter block. `buf_start` doubles as the result code
/// (1 = success, 0 = fail) once the stub finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mailbox {
    /// Source buffer address in RAM (or anywhere readable).
    pub buf_start: u32,
    /// Destination address in EEPROM or page flash.
    pub dest_addr: u32,
    /// Transfer length in bytes.
    pub length_bytes: u32,
}

impl Mailbox {
    /// Read the parameter block from its fixed address.
    pub fn load(bus: &mut impl Bus) -> Self {
        Self {
            buf_start: bus.read_u32(MAILBOX_ADDR),
            dest_addr: bus.read_u32(MAILBOX_ADDR + 4),
            length_bytes: bus.read_u32(MAILBOX_ADDR + 8),
        }
    }

    /// Overwrite the first mailbox field with the final verdict.
    pub fn store_result(bus: &mut impl Bus, success: bool) {
        bus.write_u32(MAILBOX_ADDR, success as u32);
    }
}

/// The compare/write loop.
///
/// Odd countdown values run a write pass, even ones a verify pass, starting
/// and ending with verify. A verify pass that finds source and destination
/// already equal succeeds without a single device write, which both makes
/// re-flashing identical data free and survives partial earlier writes.
///
/// Engine status codes are deliberately discarded: the hardware's error
/// signal only covers high-voltage faults, so the next comparison pass is
/// the authoritative check, and a faulted write is retried like any other
/// mismatch. Only comparison or budget exhaustion decide the verdict.
pub fn run(bus: &mut impl Bus, delay: Delay) -> bool {
    let mailbox = Mailbox::load(bus);

    let mut retries = RETRY_BUDGET;
    while retries > 0 {
        retries -= 1;
        if retries % 2 == 0 {
            if bus::compare(bus, mailbox.buf_start, mailbox.dest_addr, mailbox.length_bytes) {
                return true;
            }
        } else {
            let status = match MemoryKind::locate(mailbox.dest_addr) {
                Some(MemoryKind::Eeprom) => Eeprom::new(bus, delay).write_from(
                    mailbox.buf_start,
                    mailbox.dest_addr,
                    mailbox.length_bytes,
                ),
                Some(MemoryKind::PageFlash) => PageFlash::new(bus, delay).write_from(
                    mailbox.buf_start,
                    mailbox.dest_addr,
                    mailbox.length_bytes,
                ),
                None => Err(Status::Internal),
            };
            let _ = status;
        }
    }
    false
}

/// Raw entry point: the first instruction of the injected image.
///
/// Invoked with interrupts masked and the normal firmware suspended. Exits
/// via BKPT, which the debug transport observes as a core halt.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[no_mangle]
pub extern "C" fn stub_entry() -> ! {
    use crate::bus::Mmio;
    use crate::delay::CpuSpeed;

    // SAFETY: the stub is the only code running on the device.
    let mut bus = unsafe { Mmio::new() };
    let delay = Delay::new(CpuSpeed::Mhz20);
    let success = run(&mut bus, delay);
    Mailbox::store_result(&mut bus, success);
    loop {
        cortex_m::asm::bkpt();
    }
}
