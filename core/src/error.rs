//! Timekeeping error types

/// Timekeeping engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// RTC peripheral initialisation failed
    RtcInit,
    /// The hardware refused the alarm value
    AlarmProgramming,
    /// A configuration value is out of range
    InvalidConfig,
    /// A calendar snapshot violates the calendar invariants
    InvalidCalendar,
}

impl core::fmt::Display for TimeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RtcInit => write!(f, "RTC initialisation failed"),
            Self::AlarmProgramming => write!(f, "RTC alarm programming failed"),
            Self::InvalidConfig => write!(f, "Invalid timer configuration"),
            Self::InvalidCalendar => write!(f, "Invalid calendar value"),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for TimeError {}
