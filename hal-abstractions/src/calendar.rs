//! Calendar values exchanged with the hardware RTC

/// One reading of the hardware calendar
///
/// The hardware only stores two year digits; `century` is tracked in RAM by
/// the engine and is always 0 in raw samples returned by a [`HardwareRtc`].
///
/// `subsecond` follows the STM32 SSR convention: it counts *down* from
/// `resolution - 1` to 0 within each second.
///
/// [`HardwareRtc`]: crate::HardwareRtc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarSnapshot {
    /// Multiple of 100, RAM-tracked
    pub century: u16,
    /// 0-99
    pub year: u8,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0-23
    pub hour: u8,
    /// 0-59
    pub minute: u8,
    /// 0-59
    pub second: u8,
    /// 0..resolution, counts down
    pub subsecond: u16,
}

impl CalendarSnapshot {
    /// Create a snapshot in century 0
    pub const fn new(
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        subsecond: u16,
    ) -> Self {
        Self {
            century: 0,
            year,
            month,
            day,
            hour,
            minute,
            second,
            subsecond,
        }
    }

    /// Same snapshot placed in another century
    pub const fn with_century(mut self, century: u16) -> Self {
        self.century = century;
        self
    }
}

/// The fields an RTC alarm comparator matches on
///
/// Year and month are not part of the comparison, which is why a single
/// alarm cannot span more than one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmTime {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub subsecond: u16,
}

impl From<&CalendarSnapshot> for AlarmTime {
    fn from(cal: &CalendarSnapshot) -> Self {
        Self {
            day: cal.day,
            hour: cal.hour,
            minute: cal.minute,
            second: cal.second,
            subsecond: cal.subsecond,
        }
    }
}
