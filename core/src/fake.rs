//! In-memory RTC and board used by the unit tests
//!
//! Both halves share one simulated calendar. The calendar never advances
//! on its own; tests move it with [`FakeHw::advance`] or by entering STOP,
//! which jumps to the programmed alarm plus the configured wake latency.
#![allow(dead_code)]

use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use hal_abstractions::{AlarmTime, CalendarSnapshot, HardwareRtc, LowPowerBoard};

use crate::config::TimerConfig;
use crate::convert::Converter;
use crate::signal::AlarmSignal;

#[derive(Debug)]
pub struct FakeHw {
    /// Hardware calendar, century always 0
    pub now: CalendarSnapshot,
    pub alarm: Option<CalendarSnapshot>,
    pub alarm_enabled: bool,
    /// Served before `now` by `calendar()`
    pub unstable_reads: VecDeque<CalendarSnapshot>,
    pub calendar_reads: u32,
    pub fail_init: bool,
    pub fail_next_alarm: bool,
    pub alarms_set: u32,
    pub deactivations: u32,
    /// Ticks between the alarm match and resumed execution
    pub wake_latency_ticks: u32,
    /// Next STOP is ended by a GPIO after this many ticks
    pub gpio_wake_after: Option<u32>,
    /// Calendar moves this many ticks after every stable pair of reads
    pub advance_per_snapshot: u32,
    pub stop_entries: u32,
    pub deinits: u32,
    pub reinits: u32,
    pub resyncs: u32,
    pub wake_flag_clears: u32,
    pub backup: [u32; 2],
    converter: Converter,
}

impl FakeHw {
    pub fn shared(now: CalendarSnapshot) -> SharedHw {
        SharedHw(Rc::new(RefCell::new(Self {
            now,
            alarm: None,
            alarm_enabled: false,
            unstable_reads: VecDeque::new(),
            calendar_reads: 0,
            fail_init: false,
            fail_next_alarm: false,
            alarms_set: 0,
            deactivations: 0,
            wake_latency_ticks: 0,
            gpio_wake_after: None,
            advance_per_snapshot: 0,
            stop_entries: 0,
            deinits: 0,
            reinits: 0,
            resyncs: 0,
            wake_flag_clears: 0,
            backup: [0; 2],
            converter: Converter::new(&TimerConfig::default()),
        })))
    }

    /// Move the hardware calendar forward
    pub fn advance(&mut self, ticks: u32) {
        self.now = self.converter.from_ticks(ticks, &self.now).with_century(0);
    }

    fn jump_to_alarm(&mut self) -> bool {
        match (self.alarm_enabled, self.alarm) {
            (true, Some(target)) => {
                self.now = target.with_century(0);
                let latency = self.wake_latency_ticks;
                self.advance(latency);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SharedHw(Rc<RefCell<FakeHw>>);

impl SharedHw {
    pub fn borrow(&self) -> Ref<'_, FakeHw> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, FakeHw> {
        self.0.borrow_mut()
    }

    pub fn rtc(&self) -> FakeRtc {
        FakeRtc(self.0.clone())
    }

    pub fn board<'a>(&self, signal: &'a AlarmSignal) -> FakeBoard<'a> {
        FakeBoard {
            hw: self.0.clone(),
            signal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

pub struct FakeRtc(Rc<RefCell<FakeHw>>);

impl HardwareRtc for FakeRtc {
    type Error = FakeError;

    fn init(&mut self) -> Result<(), Self::Error> {
        if self.0.borrow().fail_init {
            Err(FakeError)
        } else {
            Ok(())
        }
    }

    fn calendar(&mut self) -> CalendarSnapshot {
        let mut hw = self.0.borrow_mut();
        hw.calendar_reads += 1;
        if let Some(sample) = hw.unstable_reads.pop_front() {
            return sample;
        }
        let now = hw.now;
        if hw.advance_per_snapshot > 0 && hw.calendar_reads % 2 == 0 {
            let ticks = hw.advance_per_snapshot;
            hw.advance(ticks);
        }
        now
    }

    fn set_alarm(&mut self, at: &CalendarSnapshot) -> Result<(), Self::Error> {
        let mut hw = self.0.borrow_mut();
        if hw.fail_next_alarm {
            hw.fail_next_alarm = false;
            return Err(FakeError);
        }
        hw.alarm = Some(*at);
        hw.alarm_enabled = true;
        hw.alarms_set += 1;
        Ok(())
    }

    fn deactivate_alarm(&mut self) {
        let mut hw = self.0.borrow_mut();
        hw.alarm_enabled = false;
        hw.deactivations += 1;
    }

    fn alarm(&mut self) -> AlarmTime {
        let hw = self.0.borrow();
        hw.alarm.as_ref().map(AlarmTime::from).unwrap_or_default()
    }

    fn write_backup(&mut self, data: [u32; 2]) {
        self.0.borrow_mut().backup = data;
    }

    fn read_backup(&mut self) -> [u32; 2] {
        self.0.borrow().backup
    }
}

pub struct FakeBoard<'a> {
    hw: Rc<RefCell<FakeHw>>,
    signal: &'a AlarmSignal,
}

impl LowPowerBoard for FakeBoard<'_> {
    fn deinit_peripherals(&mut self) {
        self.hw.borrow_mut().deinits += 1;
    }

    fn reinit_peripherals(&mut self) {
        self.hw.borrow_mut().reinits += 1;
    }

    fn resync_clock(&mut self) {
        self.hw.borrow_mut().resyncs += 1;
    }

    fn clear_wake_flag(&mut self) {
        self.hw.borrow_mut().wake_flag_clears += 1;
    }

    fn enter_stop(&mut self) {
        let mut hw = self.hw.borrow_mut();
        hw.stop_entries += 1;
        if let Some(ticks) = hw.gpio_wake_after.take() {
            hw.advance(ticks);
            return;
        }
        if hw.jump_to_alarm() {
            drop(hw);
            self.signal.raise();
        }
    }
}
