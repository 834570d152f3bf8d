//! MCU power management capability

/// Board hooks around STOP mode
pub trait LowPowerBoard {
    /// Put peripherals in their lowest power state before STOP.
    fn deinit_peripherals(&mut self);

    /// Restore peripherals after leaving STOP.
    fn reinit_peripherals(&mut self);

    /// Switch the core back to its full speed clock if it is still running
    /// on the reduced oscillator selected by the wake-up hardware.
    fn resync_clock(&mut self);

    /// Clear pending wake-up flags so the next STOP entry is not aborted.
    fn clear_wake_flag(&mut self);

    /// Execute the STOP instruction.
    ///
    /// Called with interrupts masked. Must return as soon as an enabled
    /// interrupt is pending, including one that became pending before the
    /// call; its handler runs after the caller unmasks interrupts. On
    /// Cortex-M, `WFI` with PRIMASK set behaves this way. There is no
    /// timeout.
    fn enter_stop(&mut self);
}
