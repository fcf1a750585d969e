//! The write orchestration: stub upload, mailbox marshaling, block loop.

use std::time::Duration;

use pn73xx_nvm::stub::{MAILBOX_ADDR, RAM_START, STACK_TOP};

use crate::device::{DeviceInfo, CPUID_ADDR};
use crate::error::FlashError;
use crate::probe::TargetProbe;

/// Where the stub and its working data live in target RAM.
///
/// The defaults mirror the fixed layout the stub is linked against; only
/// the buffer placement and the run timeout are genuinely tunable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubLayout {
    /// Load address of the stub image; also its entry point.
    pub load_address: u32,
    /// Parameter/result mailbox address.
    pub mailbox: u32,
    /// Initial stack pointer handed to the stub.
    pub stack_top: u32,
    /// Data staging buffer address.
    pub buffer: u32,
    /// Staging buffer size in bytes.
    pub buffer_size: u32,
    /// Wall-clock budget for one stub run. The stub itself never times out;
    /// this is the host's only protection against wedged hardware.
    pub timeout: Duration,
}

impl Default for StubLayout {
    fn default() -> Self {
        Self {
            load_address: RAM_START,
            mailbox: MAILBOX_ADDR,
            stack_top: STACK_TOP,
            buffer: RAM_START + 0x0800,
            buffer_size: 0x1000,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Programs the PN73xx page flash through the on-target write stub.
///
/// One round trip per block: stage the data in the RAM buffer, fill the
/// mailbox, start the stub, wait for its BKPT, read the verdict back out of
/// the mailbox. The stub verifies by comparing memory contents, so its 0/1
/// verdict is the only acceptance criterion; the host never re-reads the
/// flashed range itself.
pub struct FlashLoader<P> {
    probe: P,
    layout: StubLayout,
    stub_image: Vec<u8>,
    device: Option<DeviceInfo>,
    loaded: bool,
}

impl<P: TargetProbe> FlashLoader<P> {
    /// Create a loader around a probe and the compiled stub image.
    pub fn new(probe: P, stub_image: impl Into<Vec<u8>>) -> Self {
        Self {
            probe,
            layout: StubLayout::default(),
            stub_image: stub_image.into(),
            device: None,
            loaded: false,
        }
    }

    /// Replace the default RAM layout.
    pub fn with_layout(mut self, layout: StubLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Identify the device. Cached after the first successful probe.
    pub fn probe_device(&mut self) -> Result<DeviceInfo, FlashError> {
        if let Some(device) = self.device {
            return Ok(device);
        }
        self.ensure_halted()?;
        let cpuid = self.probe.read_word_32(CPUID_ADDR)?;
        let device = DeviceInfo::identify(cpuid)?;
        tracing::info!("device id = {:#010x}", cpuid);
        self.device = Some(device);
        Ok(device)
    }

    /// Upload the stub image into target RAM and verify the readback.
    pub fn load(&mut self) -> Result<(), FlashError> {
        self.ensure_halted()?;
        tracing::debug!(
            "loading {} byte write stub at {:#010x}",
            self.stub_image.len(),
            self.layout.load_address
        );
        self.probe.write_8(self.layout.load_address, &self.stub_image)?;

        let mut readback = vec![0u8; self.stub_image.len()];
        self.probe.read_8(self.layout.load_address, &mut readback)?;
        if readback != self.stub_image {
            tracing::error!("stub image mismatch after download");
            return Err(FlashError::StubNotLoaded);
        }
        self.loaded = true;
        Ok(())
    }

    /// Program `data` into page flash at `offset` from the bank base.
    ///
    /// The tail is padded to a 4-byte multiple with `0xFF` (the erased cell
    /// value, so padding over unwritten flash is a no-op) and the transfer
    /// is split into buffer-sized blocks.
    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        self.ensure_halted()?;
        if offset % 4 != 0 {
            return Err(FlashError::UnalignedOffset { offset });
        }

        let flash = self.probe_device()?.flash;
        let padded_len = data.len().next_multiple_of(4);
        if offset as usize + padded_len > flash.size as usize {
            return Err(FlashError::OutOfBounds {
                offset,
                len: padded_len,
            });
        }

        if !self.loaded {
            self.load()?;
        }

        let mut padded;
        let data = if data.len() == padded_len {
            data
        } else {
            tracing::info!("padding {} byte write with 0xff", data.len());
            padded = data.to_vec();
            padded.resize(padded_len, 0xFF);
            &padded[..]
        };

        let mut address = flash.base + offset;
        for block in data.chunks(self.layout.buffer_size as usize) {
            self.write_block(address, block)?;
            address += block.len() as u32;
        }
        Ok(())
    }

    /// The device has no separate erase step: programming merges and
    /// overwrites in place, so this is deliberately a no-op.
    pub fn erase(&mut self, _first_sector: u32, _last_sector: u32) -> Result<(), FlashError> {
        Ok(())
    }

    /// Sector protection is not implemented on this device.
    pub fn protect(
        &mut self,
        _set: bool,
        _first_sector: u32,
        _last_sector: u32,
    ) -> Result<(), FlashError> {
        Ok(())
    }

    /// Protection never engages, so there is nothing to report.
    pub fn protect_check(&mut self) -> Result<(), FlashError> {
        Ok(())
    }

    /// Plain memory read through the probe.
    pub fn read(&mut self, address: u32, data: &mut [u8]) -> Result<(), FlashError> {
        self.probe.read_8(address, data)?;
        Ok(())
    }

    /// Human-readable device summary.
    pub fn info(&mut self) -> Result<String, FlashError> {
        Ok(self.probe_device()?.summary())
    }

    fn ensure_halted(&mut self) -> Result<(), FlashError> {
        if self.probe.core_halted()? {
            Ok(())
        } else {
            Err(FlashError::NotHalted)
        }
    }

    /// One stub round trip: buffer, mailbox, run, halt, verdict.
    fn write_block(&mut self, address: u32, block: &[u8]) -> Result<(), FlashError> {
        tracing::debug!("writing {} byte block at {:#010x}", block.len(), address);

        self.probe.write_8(self.layout.buffer, block)?;
        self.probe.write_32(
            self.layout.mailbox,
            &[self.layout.buffer, address, block.len() as u32],
        )?;
        self.probe
            .run_from(self.layout.load_address, self.layout.stack_top)?;
        self.probe.wait_for_halt(self.layout.timeout)?;

        let verdict = self.probe.read_word_32(self.layout.mailbox)?;
        if verdict != 1 {
            tracing::error!("flash write failed at address {:#010x}", address);
            return Err(FlashError::OperationFailed { address });
        }
        Ok(())
    }
}
