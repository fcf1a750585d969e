//! Errors of the flash-loading procedure.

use thiserror::Error;

/// Transport-level failure reported by a probe implementation.
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// Anything that can go wrong in preparation for or during a flash write.
#[derive(Debug, Error)]
pub enum FlashError {
    /// Every operation requires the core to sit in debug state first.
    #[error("target is not halted")]
    NotHalted,

    /// Flash writes must start on a 4-byte boundary.
    #[error("offset {offset:#010x} breaks the required 4-byte alignment")]
    UnalignedOffset {
        /// The offending offset into the flash bank.
        offset: u32,
    },

    /// The write would run past the end of the flash bank.
    #[error("write of {len} bytes at offset {offset:#010x} does not fit the flash bank")]
    OutOfBounds {
        /// Offset into the flash bank.
        offset: u32,
        /// Length after padding.
        len: usize,
    },

    /// The stub's verdict for one block was 0.
    #[error("flash write failed at address {address:#010x}")]
    OperationFailed {
        /// Target address of the failed block.
        address: u32,
    },

    /// The CPUID sanity check did not find a Cortex-M0.
    #[error("cannot identify target as a PN73xx device (CPUID {cpuid:#010x})")]
    UnknownDevice {
        /// Raw CPUID register value.
        cpuid: u32,
    },

    /// RAM readback after loading the stub image did not match.
    #[error("RAM contents did not match the stub image after loading")]
    StubNotLoaded,

    /// The debug transport itself failed.
    #[error("probe transport error")]
    Probe {
        /// Underlying transport error.
        #[from]
        source: ProbeError,
    },
}
