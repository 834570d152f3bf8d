//! Wake-up latency calibration
//!
//! Leaving STOP mode restarts the HSE and PLL before foreground code runs
//! again. That fixed overhead is measured once, on the first alarm after
//! boot, and afterwards subtracted from every timeout long enough to sleep
//! through.

use hal_abstractions::{AlarmTime, CalendarSnapshot};

use crate::convert::Converter;

/// Outcome of [`WakeCalibrator::adjust_timeout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Adjusted {
    pub timeout_ms: u32,
    pub allows_low_power: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WakeCalibrator {
    latency_ms: u32,
    calibrated: bool,
    unscheduled_wake: bool,
}

impl WakeCalibrator {
    pub const fn new() -> Self {
        Self {
            latency_ms: 0,
            calibrated: false,
            unscheduled_wake: false,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn latency_ms(&self) -> u32 {
        self.latency_ms
    }

    /// Measure the latency from the alarm that woke us and the time we
    /// observed after resuming. Only the first call has an effect.
    pub fn calibrate(&mut self, converter: &Converter, alarm: &AlarmTime, now: &CalendarSnapshot) {
        if self.calibrated {
            return;
        }

        let start =
            converter.time_of_day_ticks(alarm.hour, alarm.minute, alarm.second, alarm.subsecond);
        let stop = converter.time_of_day_ticks(now.hour, now.minute, now.second, now.subsecond);
        let ticks = if stop >= start {
            stop - start
        } else {
            // woke up after midnight
            stop + converter.day_ticks() - start
        };

        self.latency_ms = converter.ticks_to_ms(ticks as u64) as u32;
        self.calibrated = true;
        info!("wake-up latency calibrated: {} ms", self.latency_ms);
    }

    /// Something other than the alarm ended the last STOP period
    pub fn note_unscheduled_wake(&mut self) {
        self.unscheduled_wake = true;
    }

    pub fn unscheduled_wake_pending(&self) -> bool {
        self.unscheduled_wake
    }

    /// Hide the wake-up latency from the caller
    ///
    /// After an unscheduled wake the latency is credited to the next timeout
    /// regardless of the floor, once. Timeouts below `floor_ms` never allow
    /// STOP mode.
    pub fn adjust_timeout(&mut self, requested_ms: u32, floor_ms: u32) -> Adjusted {
        let mut timeout_ms = requested_ms;

        if self.unscheduled_wake && timeout_ms > self.latency_ms {
            self.unscheduled_wake = false;
            timeout_ms -= self.latency_ms;
        }

        let allows_low_power = if requested_ms < floor_ms {
            false
        } else if timeout_ms > self.latency_ms {
            timeout_ms -= self.latency_ms;
            true
        } else {
            false
        };

        Adjusted {
            timeout_ms,
            allows_low_power,
        }
    }
}
