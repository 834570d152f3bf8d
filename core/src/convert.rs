//! Calendar <-> tick conversions
//!
//! A tick is one step of the RTC subsecond counter, `1 / ticks_per_second`
//! seconds. The monotonic tick counter is the calendar expressed as ticks
//! since year 0 of century 0, truncated to 32 bits. It is only meaningful
//! as a difference between two readings.
//!
//! All arithmetic is integer. Calendar -> tick is exact; ms <-> tick
//! rounds to nearest and reports the signed remainder so the drift
//! compensator can account for it.

use hal_abstractions::CalendarSnapshot;

use crate::calendar::{
    days_before_month, days_before_year, days_in_month, SECONDS_PER_DAY, SECONDS_PER_HOUR,
    SECONDS_PER_MINUTE,
};
use crate::config::{TickRatio, TimerConfig};

/// Result of a ms -> tick conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticks {
    /// Rounded tick count
    pub ticks: u64,
    /// `exact - ticks`, in units of `1 / den` tick
    pub remainder: i32,
}

/// Converter for one board's tick resolution
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    resolution: u32,
    ratio: TickRatio,
    max_span_ticks: u32,
}

impl Converter {
    pub const fn new(config: &TimerConfig) -> Self {
        Self {
            resolution: config.ticks_per_second,
            ratio: config.tick_ratio(),
            max_span_ticks: config.max_alarm_span_ticks(),
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn ratio(&self) -> TickRatio {
        self.ratio
    }

    pub fn max_span_ticks(&self) -> u32 {
        self.max_span_ticks
    }

    /// Subsecond ticks already elapsed in the current second
    fn elapsed_subticks(&self, subsecond: u16) -> u32 {
        (self.resolution - 1).saturating_sub(subsecond as u32)
    }

    /// Whole seconds since year 0 of century 0
    pub fn to_seconds(&self, cal: &CalendarSnapshot) -> u64 {
        let full_year = cal.century as u32 + cal.year as u32;
        let days = days_before_year(full_year)
            + days_before_month(cal.century, cal.year, cal.month) as u64
            + cal.day.saturating_sub(1) as u64;

        days * SECONDS_PER_DAY as u64
            + cal.hour as u64 * SECONDS_PER_HOUR as u64
            + cal.minute as u64 * SECONDS_PER_MINUTE as u64
            + cal.second as u64
    }

    /// Calendar -> monotonic tick counter
    ///
    /// `seconds * resolution + (resolution - subsecond)`, truncated to 32
    /// bits.
    pub fn to_ticks(&self, cal: &CalendarSnapshot) -> u32 {
        let ticks = self.to_seconds(cal) * self.resolution as u64
            + self.resolution as u64
            - cal.subsecond as u64;
        ticks as u32
    }

    /// Ticks elapsed since midnight of the snapshot's day
    pub fn time_of_day_ticks(&self, hour: u8, minute: u8, second: u8, subsecond: u16) -> u32 {
        let secs =
            hour as u32 * SECONDS_PER_HOUR + minute as u32 * SECONDS_PER_MINUTE + second as u32;
        secs * self.resolution + self.elapsed_subticks(subsecond)
    }

    /// Ticks in one day
    pub fn day_ticks(&self) -> u32 {
        SECONDS_PER_DAY * self.resolution
    }

    /// Add a tick offset to `base`
    ///
    /// The offset is clamped to the longest representable alarm span.
    /// Carries propagate second -> minute -> hour -> day -> month -> year
    /// -> century using the RTC leap rule.
    pub fn from_ticks(&self, offset: u32, base: &CalendarSnapshot) -> CalendarSnapshot {
        let offset = if offset > self.max_span_ticks {
            warn!(
                "alarm offset {} clamped to span {}",
                offset, self.max_span_ticks
            );
            self.max_span_ticks
        } else {
            offset
        };

        let mut subticks = self.elapsed_subticks(base.subsecond) + offset % self.resolution;
        let mut secs = offset / self.resolution;
        if subticks >= self.resolution {
            subticks -= self.resolution;
            secs += 1;
        }

        let mut second = base.second as u32 + secs % SECONDS_PER_MINUTE;
        let mut minute = base.minute as u32 + (secs / SECONDS_PER_MINUTE) % 60;
        let mut hour = base.hour as u32 + (secs / SECONDS_PER_HOUR) % 24;
        let mut day = base.day as u32 + secs / SECONDS_PER_DAY;

        if second >= 60 {
            second -= 60;
            minute += 1;
        }
        if minute >= 60 {
            minute -= 60;
            hour += 1;
        }
        if hour >= 24 {
            hour -= 24;
            day += 1;
        }

        let mut month = base.month;
        let mut year = base.year;
        let mut century = base.century;
        loop {
            let dim = days_in_month(century, year, month) as u32;
            if day <= dim {
                break;
            }
            day -= dim;
            month += 1;
            if month > 12 {
                month = 1;
                if year == 99 {
                    year = 0;
                    century = century.wrapping_add(100);
                } else {
                    year += 1;
                }
            }
        }

        CalendarSnapshot {
            century,
            year,
            month,
            day: day as u8,
            hour: hour as u8,
            minute: minute as u8,
            second: second as u8,
            subsecond: (self.resolution - 1 - subticks) as u16,
        }
    }

    /// ms -> ticks, rounded to nearest
    pub fn ms_to_ticks(&self, ms: u32) -> Ticks {
        let num = self.ratio.num as u64;
        let den = self.ratio.den as u64;
        let scaled = ms as u64 * num;
        let ticks = (scaled + den / 2) / den;
        Ticks {
            ticks,
            remainder: (scaled as i64 - (ticks * den) as i64) as i32,
        }
    }

    /// ticks -> ms, rounded to nearest
    pub fn ticks_to_ms(&self, ticks: u64) -> u64 {
        let num = self.ratio.num as u64;
        let den = self.ratio.den as u64;
        (ticks * den + num / 2) / num
    }

    /// ms image of the full 2^32 tick period
    pub fn wrap_ms(&self) -> u64 {
        self.ticks_to_ms(1u64 << 32)
    }
}
