//! On-target NVM write engines for the NXP PN73xx family.
//!
//! The PN73xx exposes a 4 KiB EEPROM (64-byte pages) and 158 KiB of
//! page-organized flash (128-byte pages, two banks in lockstep) through the
//! memory-mapped EECTRL block. This crate implements the register-level
//! write sequences for both memories and the verify-and-retry stub that a
//! debug probe injects into target RAM to drive them. No interrupts, no
//! allocator; all waiting is busy-polling.
//!
//! Everything is generic over the [`bus::Bus`] trait, so the same engines
//! that run against raw MMIO on the device are unit-tested on the host
//! against a RAM-backed model of the controller.

#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod delay;
pub mod eeprom;
pub mod flash;
pub mod region;
pub mod registers;
pub mod status;
pub mod stub;

#[cfg(test)]
pub(crate) mod test;

pub use bus::{Bus, Mmio};
pub use delay::{CpuSpeed, Delay};
pub use eeprom::Eeprom;
pub use flash::PageFlash;
pub use region::{MemoryKind, Region, EEPROM, PAGE_FLASH};
pub use status::Status;
