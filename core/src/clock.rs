//! Hardware calendar access
//!
//! The RTC shadow registers are clocked from the asynchronous LSE domain
//! and can change between the time and date reads. A sample is only
//! accepted once two consecutive reads agree.

use hal_abstractions::{AlarmTime, CalendarSnapshot, HardwareRtc};

use crate::calendar::CenturyTracker;
use crate::convert::Converter;

pub struct RtcClock<R> {
    rtc: R,
    century: CenturyTracker,
    converter: Converter,
}

impl<R: HardwareRtc> RtcClock<R> {
    pub fn new(rtc: R, converter: Converter) -> Self {
        Self {
            rtc,
            century: CenturyTracker::new(),
            converter,
        }
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn rtc_mut(&mut self) -> &mut R {
        &mut self.rtc
    }

    /// Stable calendar read with the RAM century applied
    pub fn snapshot(&mut self) -> CalendarSnapshot {
        let mut previous = self.rtc.calendar();
        loop {
            let current = self.rtc.calendar();
            if current == previous {
                break;
            }
            trace!("rtc: calendar changed during read, retrying");
            previous = current;
        }

        let century = self.century.observe(previous.year);
        previous.with_century(century)
    }

    /// Current monotonic tick counter
    pub fn now_ticks(&mut self) -> u32 {
        let now = self.snapshot();
        self.converter.to_ticks(&now)
    }

    /// Programmed alarm as read back from the hardware
    pub fn alarm(&mut self) -> AlarmTime {
        self.rtc.alarm()
    }
}
