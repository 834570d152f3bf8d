//! Interrupt -> main loop alarm flag
//!
//! The RTC alarm interrupt only raises this flag. Everything else (clock
//! resync, calibration, gate release, application callback) runs on the
//! main loop when it takes the flag.

use core::sync::atomic::{AtomicU32, Ordering};

/// Lock-free "alarm fired" counter, safe to share with an ISR
#[derive(Debug)]
pub struct AlarmSignal {
    fired: AtomicU32,
}

impl AlarmSignal {
    pub const fn new() -> Self {
        Self {
            fired: AtomicU32::new(0),
        }
    }

    /// Called from the alarm interrupt
    pub fn raise(&self) {
        self.fired.fetch_add(1, Ordering::Release);
    }

    /// Consume all pending fires, returns how many were seen
    pub fn take(&self) -> u32 {
        self.fired.swap(0, Ordering::Acquire)
    }

    pub fn is_pending(&self) -> bool {
        self.fired.load(Ordering::Acquire) != 0
    }
}

impl Default for AlarmSignal {
    fn default() -> Self {
        Self::new()
    }
}
