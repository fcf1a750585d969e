//! Status codes shared by every engine operation.

use thiserror::Error;

/// The sole error-reporting channel on the target: there are no panics and
/// no unwinding in the write path, every operation returns one of these.
///
/// The numeric values are fixed by the ROM interface. Only [`Status::Memory`]
/// and [`Status::Timeout`] are produced by the write engines; the rest of the
/// family is reserved for sibling ROM modules that share the enumeration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// The hardware raised the high-voltage fault flag during a program
    /// pulse. The aborted page may be left partially written.
    #[error("high-voltage fault during the program pulse")]
    Memory = 0x01,
    /// Catch-all for conditions the caller cannot act on.
    #[error("internal error")]
    Internal = 0x02,
    /// A busy poll exhausted its spin budget.
    #[error("program-busy poll exceeded its spin budget")]
    Timeout = 0x03,
    /// CRC mismatch.
    #[error("CRC mismatch")]
    Crc = 0x05,
    /// Requested object does not exist.
    #[error("not found")]
    NotFound = 0x07,
    /// The controller is occupied with a previous request.
    #[error("controller busy")]
    Busy = 0x08,
    /// An argument failed validation.
    #[error("invalid parameter")]
    Parameter = 0x09,
    /// Unrecognized command byte.
    #[error("unknown command")]
    UnknownCommand = 0x0B,
    /// The command was aborted before completion.
    #[error("command aborted")]
    Aborted = 0x0C,
    /// Unclassified failure.
    #[error("unknown error")]
    Unknown = 0xFF,
}
