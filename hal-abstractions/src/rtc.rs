//! Calendar RTC capability

use crate::calendar::{AlarmTime, CalendarSnapshot};

/// A free-running calendar RTC with one alarm comparator
///
/// Implementations are thin register adapters. They must not retry or
/// filter reads: the engine owns the double-sample-and-compare loop.
pub trait HardwareRtc {
    /// Adapter specific failure
    type Error: core::fmt::Debug;

    /// Configure prescalers and, on a cold start, load the calendar epoch
    /// (year 0, January 1st, 00:00:00).
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Take a single, unsynchronised sample of the calendar registers.
    ///
    /// The underlying counter runs asynchronously to the bus clock, so two
    /// consecutive samples may disagree.
    fn calendar(&mut self) -> CalendarSnapshot;

    /// Program and enable the alarm interrupt.
    ///
    /// Only the [`AlarmTime`] fields of `at` are compared by hardware; the
    /// full snapshot is passed so adapters (and test doubles) can keep it.
    fn set_alarm(&mut self, at: &CalendarSnapshot) -> Result<(), Self::Error>;

    /// Disable the alarm and its interrupt. Must be idempotent.
    fn deactivate_alarm(&mut self);

    /// Read back the currently programmed alarm.
    fn alarm(&mut self) -> AlarmTime;

    /// Store two words in the battery-backed domain.
    ///
    /// Boards without spare backup registers keep the default, which
    /// discards the data.
    fn write_backup(&mut self, _data: [u32; 2]) {}

    /// Words last stored with [`write_backup`](Self::write_backup), zeros
    /// if the board has no backup registers.
    fn read_backup(&mut self) -> [u32; 2] {
        [0; 2]
    }
}
