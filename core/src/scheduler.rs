//! Single hardware alarm scheduler
//!
//! There is exactly one alarm comparator, so there is exactly one
//! [`AlarmContext`]. Arming always replaces the previous alarm; there is no
//! separate cancel operation.
//!
//! Offsets longer than one alarm span are split into segments. Each
//! segment is programmed relative to the previous target so the chain does
//! not accumulate wake-up latency.

use hal_abstractions::{CalendarSnapshot, HardwareRtc};

use crate::clock::RtcClock;
use crate::error::TimeError;
use crate::signal::AlarmSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmContext {
    /// Calendar when the alarm was requested, reference for elapsed time
    pub armed_at: CalendarSnapshot,
    /// Calendar programmed into the comparator
    pub target: CalendarSnapshot,
    /// Ticks still to cover after `target` fires
    pub remaining_ticks: u64,
}

#[derive(Debug)]
pub struct Scheduler {
    context: Option<AlarmContext>,
    min_ticks: u32,
}

impl Scheduler {
    pub const fn new(min_ticks: u32) -> Self {
        Self {
            context: None,
            min_ticks,
        }
    }

    pub fn context(&self) -> Option<&AlarmContext> {
        self.context.as_ref()
    }

    pub fn min_ticks(&self) -> u32 {
        self.min_ticks
    }

    /// Program the alarm `ticks` from now
    ///
    /// Any previous alarm is deactivated first and a fire it left on
    /// `signal` is discarded. The snapshot and the programming run with
    /// interrupts masked so the target is computed from the same instant the
    /// comparator is loaded.
    pub fn arm<R: HardwareRtc>(
        &mut self,
        clock: &mut RtcClock<R>,
        ticks: u64,
        signal: &AlarmSignal,
    ) -> Result<AlarmContext, TimeError> {
        critical_section::with(|_| {
            clock.rtc_mut().deactivate_alarm();
            if signal.take() > 0 {
                trace!("dropped fire of the replaced alarm");
            }

            let ticks = ticks.max(self.min_ticks as u64);
            let segment = ticks.min(clock.converter().max_span_ticks() as u64) as u32;

            let now = clock.snapshot();
            let target = clock.converter().from_ticks(segment, &now);
            let context = AlarmContext {
                armed_at: now,
                target,
                remaining_ticks: ticks - segment as u64,
            };
            self.context = Some(context);

            clock
                .rtc_mut()
                .set_alarm(&target)
                .map_err(|_| TimeError::AlarmProgramming)?;

            debug!(
                "alarm armed: {} ticks, target {}:{}:{} ss {}",
                segment, target.hour, target.minute, target.second, target.subsecond
            );
            Ok(context)
        })
    }

    /// Program the next segment of a chained alarm
    ///
    /// Returns `Ok(false)` when the current alarm was the last segment.
    pub fn continue_chain<R: HardwareRtc>(
        &mut self,
        clock: &mut RtcClock<R>,
    ) -> Result<bool, TimeError> {
        let Some(mut context) = self.context.filter(|ctx| ctx.remaining_ticks > 0) else {
            return Ok(false);
        };

        critical_section::with(|_| {
            clock.rtc_mut().deactivate_alarm();

            let segment = context
                .remaining_ticks
                .min(clock.converter().max_span_ticks() as u64) as u32;
            let segment = segment.max(self.min_ticks);

            context.target = clock.converter().from_ticks(segment, &context.target);
            context.remaining_ticks = context.remaining_ticks.saturating_sub(segment as u64);
            self.context = Some(context);

            clock
                .rtc_mut()
                .set_alarm(&context.target)
                .map_err(|_| TimeError::AlarmProgramming)?;

            debug!(
                "alarm chained: {} ticks, {} remaining",
                segment, context.remaining_ticks
            );
            Ok(true)
        })
    }

    /// Ticks since the last `arm`, modulo 2^32
    ///
    /// Zero if no alarm was ever armed.
    pub fn elapsed_since_last_arm<R: HardwareRtc>(&self, clock: &mut RtcClock<R>) -> u32 {
        match self.context {
            Some(context) => {
                let reference = clock.converter().to_ticks(&context.armed_at);
                clock.now_ticks().wrapping_sub(reference)
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;
    use crate::convert::Converter;
    use crate::fake::{FakeHw, FakeRtc, SharedHw};

    fn setup(now: CalendarSnapshot) -> (SharedHw, RtcClock<FakeRtc>, Scheduler, AlarmSignal) {
        let hw = FakeHw::shared(now);
        let config = TimerConfig::default();
        let clock = RtcClock::new(hw.rtc(), Converter::new(&config));
        (
            hw,
            clock,
            Scheduler::new(config.min_timeout_ticks),
            AlarmSignal::new(),
        )
    }

    #[test]
    fn test_one_second_alarm_from_epoch() {
        let (hw, mut clock, mut scheduler, signal) = setup(CalendarSnapshot::new(0, 1, 1, 0, 0, 0, 2047));
        let context = scheduler.arm(&mut clock, 2048, &signal).unwrap();
        assert_eq!(context.target.second, 1);
        assert_eq!(context.target.minute, 0);
        assert_eq!((context.target.year, context.target.month), (0, 1));
        assert_eq!(hw.borrow().alarm, Some(context.target));
    }

    #[test]
    fn test_rearm_replaces_previous_alarm() {
        let (hw, mut clock, mut scheduler, signal) = setup(CalendarSnapshot::new(5, 3, 10, 8, 0, 0, 1000));
        let first = scheduler.arm(&mut clock, 10_000, &signal).unwrap();
        hw.borrow_mut().advance(50);
        let second = scheduler.arm(&mut clock, 2000, &signal).unwrap();

        let conv = *clock.converter();
        assert_ne!(first.target, second.target);
        assert_eq!(
            conv.to_ticks(&second.target)
                .wrapping_sub(conv.to_ticks(&first.armed_at)),
            2050
        );
        let hw = hw.borrow();
        assert_eq!(hw.deactivations, 2);
        assert_eq!(hw.alarms_set, 2);
        assert!(hw.alarm_enabled);
        assert_eq!(hw.alarm, Some(second.target));
    }

    #[test]
    fn test_minimum_offset() {
        let (_hw, mut clock, mut scheduler, signal) = setup(CalendarSnapshot::new(5, 3, 10, 8, 0, 0, 1000));
        let context = scheduler.arm(&mut clock, 0, &signal).unwrap();
        let conv = *clock.converter();
        assert_eq!(
            conv.to_ticks(&context.target)
                .wrapping_sub(conv.to_ticks(&context.armed_at)),
            3
        );
    }

    #[test]
    fn test_programming_failure() {
        let (hw, mut clock, mut scheduler, signal) = setup(CalendarSnapshot::new(5, 3, 10, 8, 0, 0, 1000));
        hw.borrow_mut().fail_next_alarm = true;
        assert_eq!(
            scheduler.arm(&mut clock, 100, &signal),
            Err(TimeError::AlarmProgramming)
        );
    }

    #[test]
    fn test_elapsed_across_counter_wrap() {
        let conv = Converter::new(&TimerConfig::default());
        let epoch = CalendarSnapshot::new(0, 1, 1, 0, 0, 0, 2047);
        // tick counter 100 ticks before wrapping
        let start = conv.from_ticks(u32::MAX - 100, &epoch);
        assert_eq!(conv.to_ticks(&start), u32::MAX - 99);

        let (hw, mut clock, mut scheduler, signal) = setup(start);
        assert_eq!(scheduler.elapsed_since_last_arm(&mut clock), 0);
        scheduler.arm(&mut clock, 10_000, &signal).unwrap();
        hw.borrow_mut().advance(300);

        assert!(clock.now_ticks() < 1000);
        assert_eq!(scheduler.elapsed_since_last_arm(&mut clock), 300);
    }

    #[test]
    fn test_chained_alarm_beyond_span() {
        let (_hw, mut clock, mut scheduler, signal) = setup(CalendarSnapshot::new(7, 1, 1, 0, 0, 0, 2047));
        let conv = *clock.converter();
        let span = conv.max_span_ticks() as u64;

        let first = scheduler.arm(&mut clock, span + 5000, &signal).unwrap();
        assert_eq!(first.remaining_ticks, 5000);

        assert_eq!(scheduler.continue_chain(&mut clock), Ok(true));
        let chained = *scheduler.context().unwrap();
        assert_eq!(chained.remaining_ticks, 0);
        assert_eq!(chained.armed_at, first.armed_at);
        assert_eq!(
            conv.to_ticks(&chained.target)
                .wrapping_sub(conv.to_ticks(&first.target)),
            5000
        );

        assert_eq!(scheduler.continue_chain(&mut clock), Ok(false));
    }

    #[test]
    fn test_rearm_discards_stale_fire() {
        let (hw, mut clock, mut scheduler, signal) =
            setup(CalendarSnapshot::new(5, 3, 10, 8, 0, 0, 1000));
        scheduler.arm(&mut clock, 2048, &signal).unwrap();
        hw.borrow_mut().advance(2048);
        signal.raise();

        scheduler.arm(&mut clock, 60 * 2048, &signal).unwrap();
        assert!(!signal.is_pending());
        assert!(hw.borrow().alarm_enabled);
    }
}
