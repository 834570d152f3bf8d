//! Timer engine configuration

use crate::error::TimeError;

/// Seconds in 28 days, the longest span every month can hold
const FOUR_WEEKS_SECS: u32 = 28 * 86_400;

/// Board specific timer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    /// Subsecond counter resolution (synchronous prescaler + 1)
    pub ticks_per_second: u32,
    /// Smallest alarm offset that is still guaranteed to fire
    pub min_timeout_ticks: u32,
    /// Longest offset a single alarm may carry
    pub max_alarm_span_secs: u32,
    /// Timeouts shorter than this never allow STOP mode
    pub low_power_floor_ms: u32,
    /// Alarm used to measure the wake-up latency on first boot
    pub calibration_timeout_ms: u32,
}

impl TimerConfig {
    pub const fn new(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second,
            min_timeout_ticks: 3,
            max_alarm_span_secs: FOUR_WEEKS_SECS,
            low_power_floor_ms: 50,
            calibration_timeout_ms: 1000,
        }
    }

    /// Check ranges the converter relies on
    pub fn validate(&self) -> Result<(), TimeError> {
        // subsecond is a u16 and the STM32 SSR is 15 bits wide
        if self.ticks_per_second == 0 || self.ticks_per_second > 32_768 {
            return Err(TimeError::InvalidConfig);
        }
        if self.min_timeout_ticks == 0 {
            return Err(TimeError::InvalidConfig);
        }
        if self.max_alarm_span_secs == 0 || self.max_alarm_span_secs > FOUR_WEEKS_SECS {
            return Err(TimeError::InvalidConfig);
        }
        Ok(())
    }

    /// Fixed-point ms -> tick ratio
    pub const fn tick_ratio(&self) -> TickRatio {
        TickRatio::new(self.ticks_per_second)
    }

    /// Longest single alarm offset in ticks
    pub const fn max_alarm_span_ticks(&self) -> u32 {
        let ticks = self.max_alarm_span_secs as u64 * self.ticks_per_second as u64;
        if ticks > u32::MAX as u64 {
            u32::MAX
        } else {
            ticks as u32
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        // LSE 32.768 kHz, PREDIV_A = 16, PREDIV_S = 2048
        Self::new(2048)
    }
}

/// `ticks / ms = num / den`, reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickRatio {
    pub num: u32,
    pub den: u32,
}

impl TickRatio {
    pub const fn new(ticks_per_second: u32) -> Self {
        let g = gcd(ticks_per_second, 1000);
        Self {
            num: ticks_per_second / g,
            den: 1000 / g,
        }
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ratio() {
        let ratio = TimerConfig::default().tick_ratio();
        assert_eq!(ratio, TickRatio { num: 256, den: 125 });
    }

    #[test]
    fn test_ratio_for_millisecond_ticks() {
        assert_eq!(TickRatio::new(1000), TickRatio { num: 1, den: 1 });
        assert_eq!(TickRatio::new(1024), TickRatio { num: 128, den: 125 });
    }

    #[test]
    fn test_span_saturates() {
        // 28 days at 2048 ticks/s does not fit 32 bits
        assert_eq!(TimerConfig::default().max_alarm_span_ticks(), u32::MAX);
        assert_eq!(
            TimerConfig::new(1024).max_alarm_span_ticks(),
            28 * 86_400 * 1024
        );
    }

    #[test]
    fn test_validate() {
        assert!(TimerConfig::default().validate().is_ok());
        assert_eq!(
            TimerConfig::new(0).validate(),
            Err(TimeError::InvalidConfig)
        );
        let mut cfg = TimerConfig::default();
        cfg.max_alarm_span_secs = 40 * 86_400;
        assert_eq!(cfg.validate(), Err(TimeError::InvalidConfig));
    }
}
