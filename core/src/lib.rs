//! Platform-agnostic RTC timekeeping and wake-alarm engine
//!
//! This crate bridges a free-running calendar RTC and the monotonic
//! millisecond timer API used by a protocol stack. It has NO hardware
//! dependencies: boards plug in through the traits of `hal-abstractions`.
//!
//! ## Architecture
//! - [`convert`]: calendar snapshot <-> 32-bit monotonic tick counter
//! - [`scheduler`]: programs the single hardware alarm and keeps its context
//! - [`calibration`]: measures the STOP-mode wake-up latency once per boot
//! - [`gate`]: decides whether STOP mode may be entered
//! - [`drift`]: folds ms->tick rounding errors back into programmed alarms
//! - [`engine`]: the API surface tying everything together
//!
//! ## Interrupt model
//! The alarm ISR only raises an [`AlarmSignal`]. All bookkeeping runs from
//! [`TimerEngine::process`], called by the main loop right after wake-up.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod calendar;
pub mod calibration;
pub mod clock;
pub mod config;
pub mod convert;
pub mod drift;
pub mod engine;
pub mod error;
pub mod gate;
pub mod scheduler;
pub mod signal;
pub mod temperature;

#[cfg(test)]
mod fake;

pub use config::TimerConfig;
pub use engine::{AlarmCallback, CalendarTime, TimerEngine};
pub use error::TimeError;
pub use hal_abstractions::{AlarmTime, CalendarSnapshot, HardwareRtc, LowPowerBoard};
pub use signal::AlarmSignal;
pub use temperature::CrystalModel;
