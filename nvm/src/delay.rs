//! Calibrated busy-wait.
//!
//! The stub runs with interrupts masked and no timer set up, so all waiting
//! is a dead loop. The loop is calibrated per CPU clock; the calibration is
//! an input, not something this crate measures.

/// CPU clock the delay loop is calibrated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CpuSpeed {
    /// 20 MHz system clock.
    Mhz20,
    /// 10 MHz system clock.
    Mhz10,
    /// 5 MHz system clock.
    Mhz5,
}

/// Microsecond-granularity busy-wait.
#[derive(Debug, Clone, Copy)]
pub struct Delay {
    // Right-shift applied to the microsecond count to get loop iterations,
    // matching the instruction count of the compiled loop at each clock.
    shift: u32,
}

impl Delay {
    /// Calibrate the dead loop for the given CPU clock.
    pub const fn new(speed: CpuSpeed) -> Self {
        let shift = match speed {
            CpuSpeed::Mhz20 => 2,
            CpuSpeed::Mhz10 => 3,
            CpuSpeed::Mhz5 => 4,
        };
        Self { shift }
    }

    /// Spin for at least `us` microseconds.
    pub fn wait_us(&self, us: u32) {
        let mut spins = us >> self.shift;
        while spins > 0 {
            core::hint::spin_loop();
            spins -= 1;
        }
    }
}
