//! Calendar rules for a two-digit-year hardware RTC
//!
//! The RTC calendar only stores years 00-99 and applies its own leap rule:
//! every year divisible by 4 has a 29th of February, including year 00.
//! These helpers use exactly that rule so software and hardware never
//! disagree about month lengths.
//!
//! The century is not stored in hardware. [`CenturyTracker`] extends the
//! year field by watching for the 99 -> 00 transition in RAM; a power
//! cycle spanning that boundary is not detected.
#![deny(unsafe_code)]
#![deny(warnings)]

use hal_abstractions::CalendarSnapshot;

pub const SECONDS_PER_MINUTE: u32 = 60;
pub const SECONDS_PER_HOUR: u32 = 3600;
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Days per month, non-leap years
const DAYS_IN_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Days per month, leap years
const DAYS_IN_MONTH_LEAP: [u8; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Days before the first of each month, non-leap years
const DAYS_BEFORE_MONTH: [u16; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Days before the first of each month, leap years
const DAYS_BEFORE_MONTH_LEAP: [u16; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Check if a year is a leap year under the RTC rule
///
/// The century is added to the year before testing; since centuries are
/// multiples of 100 this only matters for readability.
/// - year 00: leap
/// - year divisible by 4: leap
/// - everything else: not leap
pub fn is_leap_year(century: u16, year: u8) -> bool {
    year == 0 || (century as u32 + year as u32) % 4 == 0
}

/// Number of days in `month` (1-12)
pub fn days_in_month(century: u16, year: u8, month: u8) -> u8 {
    let table = if is_leap_year(century, year) {
        &DAYS_IN_MONTH_LEAP
    } else {
        &DAYS_IN_MONTH
    };
    table[(month.clamp(1, 12) - 1) as usize]
}

/// Days from January 1st to the first of `month`
pub(crate) fn days_before_month(century: u16, year: u8, month: u8) -> u32 {
    let table = if is_leap_year(century, year) {
        &DAYS_BEFORE_MONTH_LEAP
    } else {
        &DAYS_BEFORE_MONTH
    };
    table[(month.clamp(1, 12) - 1) as usize] as u32
}

/// Days from year 0 to January 1st of `full_year`
///
/// Leap years are the years `i` in `[0, full_year)` with `i % 4 == 0`,
/// so their count is `ceil(full_year / 4)`. O(1), no year iteration.
pub(crate) fn days_before_year(full_year: u32) -> u64 {
    full_year as u64 * 365 + (full_year as u64).div_ceil(4)
}

/// Check a snapshot against the calendar invariants
pub fn is_valid(cal: &CalendarSnapshot, ticks_per_second: u32) -> bool {
    cal.century % 100 == 0
        && cal.year <= 99
        && (1..=12).contains(&cal.month)
        && cal.day >= 1
        && cal.day <= days_in_month(cal.century, cal.year, cal.month)
        && cal.hour < 24
        && cal.minute < 60
        && cal.second < 60
        && (cal.subsecond as u32) < ticks_per_second
}

/// RAM-side century counter
///
/// Seeing year 99 arms a pending rollover. The next observed year below
/// the recorded one means the hardware wrapped to 00.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CenturyTracker {
    century: u16,
    pending_from: Option<u8>,
}

impl CenturyTracker {
    pub const fn new() -> Self {
        Self {
            century: 0,
            pending_from: None,
        }
    }

    /// Current century (multiple of 100)
    pub fn century(&self) -> u16 {
        self.century
    }

    /// Feed one observed hardware year and return the century it belongs to
    pub fn observe(&mut self, year: u8) -> u16 {
        match self.pending_from {
            Some(recorded) if year < recorded => {
                self.century = self.century.wrapping_add(100);
                self.pending_from = None;
            }
            None if year == 99 => {
                self.pending_from = Some(year);
            }
            _ => {}
        }
        self.century
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(0, 0)); // year 00 rule
        assert!(is_leap_year(0, 24)); // Divisible by 4
        assert!(is_leap_year(100, 0));
        assert!(!is_leap_year(0, 3));
        assert!(!is_leap_year(0, 99));
    }

    #[test]
    fn test_february_length() {
        assert_eq!(days_in_month(0, 0, 2), 29);
        assert_eq!(days_in_month(0, 4, 2), 29);
        assert_eq!(days_in_month(0, 5, 2), 28);
        assert_eq!(days_in_month(0, 5, 4), 30);
        assert_eq!(days_in_month(0, 5, 12), 31);
    }

    #[test]
    fn test_cumulative_tables_match_lengths() {
        for year in [0u8, 1] {
            let mut total = 0u32;
            for month in 1..=12u8 {
                assert_eq!(days_before_month(0, year, month), total);
                total += days_in_month(0, year, month) as u32;
            }
            assert_eq!(total, if year == 0 { 366 } else { 365 });
        }
    }

    #[test]
    fn test_days_before_year() {
        assert_eq!(days_before_year(0), 0);
        assert_eq!(days_before_year(1), 366);
        assert_eq!(days_before_year(4), 366 + 3 * 365);
        assert_eq!(days_before_year(5), 2 * 366 + 3 * 365);
    }

    #[test]
    fn test_validity() {
        assert!(is_valid(&CalendarSnapshot::new(0, 2, 29, 0, 0, 0, 0), 2048));
        assert!(!is_valid(&CalendarSnapshot::new(1, 2, 29, 0, 0, 0, 0), 2048));
        assert!(!is_valid(&CalendarSnapshot::new(1, 13, 1, 0, 0, 0, 0), 2048));
        assert!(!is_valid(&CalendarSnapshot::new(1, 1, 1, 0, 0, 0, 2048), 2048));
    }

    #[test]
    fn test_century_rollover() {
        let mut tracker = CenturyTracker::new();
        assert_eq!(tracker.observe(98), 0);
        assert_eq!(tracker.observe(99), 0);
        // still in year 99, no rollover yet
        assert_eq!(tracker.observe(99), 0);
        assert_eq!(tracker.observe(0), 100);
        assert_eq!(tracker.observe(0), 100);
        assert_eq!(tracker.observe(1), 100);
    }

    #[test]
    fn test_no_rollover_without_year_99() {
        let mut tracker = CenturyTracker::new();
        assert_eq!(tracker.observe(50), 0);
        assert_eq!(tracker.observe(3), 0);
    }
}
