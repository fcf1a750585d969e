//! Host-side flash loader for NXP PN73xx devices.
//!
//! The PN73xx programs its EEPROM and page flash through an on-target write
//! stub ([`pn73xx_nvm`]) rather than through probe-visible registers. This
//! crate is the host half of that protocol: it uploads the compiled stub
//! into working RAM, then for every data block fills the RAM mailbox
//! (buffer address, destination, length), starts the stub, waits for its
//! BKPT and reads the 0/1 verdict back out of the mailbox.
//!
//! The probe transport itself is abstracted behind [`TargetProbe`]; any SWD
//! or JTAG driver that can read/write target memory and start the core can
//! sit underneath.

pub mod device;
pub mod error;
pub mod loader;
pub mod probe;

pub use device::{DeviceInfo, FlashGeometry};
pub use error::{FlashError, ProbeError};
pub use loader::{FlashLoader, StubLayout};
pub use probe::TargetProbe;
