//! Device identity and memory geometry.

use serde::{Deserialize, Serialize};

use pn73xx_nvm::region::{EEPROM, PAGE_FLASH};

use crate::error::FlashError;

/// CPUID register of the Cortex-M system control space.
pub const CPUID_ADDR: u32 = 0xE000_ED00;

/// CPUID part number of a Cortex-M0.
const CORTEX_M0_PARTNO: u32 = 0xC20;

/// Geometry of one programmable bank as presented to a flash-tool frontend.
/// Sectors are reported at hardware page granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashGeometry {
    /// First address of the bank.
    pub base: u32,
    /// Bank size in bytes.
    pub size: u32,
    /// Sector (page) size in bytes.
    pub sector_size: u32,
    /// Number of sectors.
    pub sector_count: u32,
}

impl FlashGeometry {
    /// Page-flash geometry from the fixed PN73xx memory map.
    pub fn page_flash() -> Self {
        let size = PAGE_FLASH.end - PAGE_FLASH.base + 1;
        Self {
            base: PAGE_FLASH.base,
            size,
            sector_size: PAGE_FLASH.page_size,
            sector_count: size / PAGE_FLASH.page_size,
        }
    }

    /// EEPROM geometry from the fixed PN73xx memory map.
    pub fn eeprom() -> Self {
        let size = EEPROM.end - EEPROM.base + 1;
        Self {
            base: EEPROM.base,
            size,
            sector_size: EEPROM.page_size,
            sector_count: size / EEPROM.page_size,
        }
    }
}

/// Identity of a probed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Raw CPUID register value.
    pub cpuid: u32,
    /// Page-flash bank.
    pub flash: FlashGeometry,
    /// EEPROM bank.
    pub eeprom: FlashGeometry,
}

impl DeviceInfo {
    /// Build the device description from a CPUID readout.
    ///
    /// The PN73xx has no usable device-id register, so the only sanity check
    /// is that the core is a Cortex-M0; geometry comes from the fixed memory
    /// map.
    pub fn identify(cpuid: u32) -> Result<Self, FlashError> {
        if (cpuid >> 4) & 0xFFF != CORTEX_M0_PARTNO {
            return Err(FlashError::UnknownDevice { cpuid });
        }
        Ok(Self {
            cpuid,
            flash: FlashGeometry::page_flash(),
            eeprom: FlashGeometry::eeprom(),
        })
    }

    /// Human-readable device summary.
    pub fn summary(&self) -> String {
        format!(
            "pn73xxxx - {} KiB page flash, {} KiB EEPROM",
            self.flash.size / 1024,
            self.eeprom.size / 1024
        )
    }
}
