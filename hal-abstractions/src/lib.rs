//! Hardware abstraction traits for the RTC timekeeping engine
//!
//! This crate defines the capabilities the engine consumes from a board:
//! a calendar RTC with a single alarm comparator, and the MCU power
//! management needed to enter and leave STOP mode. BSPs implement these
//! traits; the engine in `rtc-timekeeper` is written once against them.

#![no_std]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod calendar;
pub mod power;
pub mod rtc;

pub use calendar::{AlarmTime, CalendarSnapshot};
pub use power::LowPowerBoard;
pub use rtc::HardwareRtc;
