//! Timer engine
//!
//! [`TimerEngine`] owns every piece of timekeeping state: the alarm
//! context, the drift accumulator, the wake-up latency and the STOP gate.
//! It is created once by the board and lives for the rest of the program.
//!
//! # Main loop contract
//!
//! ```ignore
//! engine.init()?;
//! loop {
//!     if engine.process() {
//!         // alarm expired, callback already ran
//!     }
//!     engine.enter_low_power_if_allowed();
//! }
//! ```
//!
//! The alarm interrupt must only call [`AlarmSignal::raise`]; everything
//! else happens in [`TimerEngine::process`].

use hal_abstractions::{CalendarSnapshot, HardwareRtc, LowPowerBoard};

use crate::calendar;
use crate::calibration::WakeCalibrator;
use crate::clock::RtcClock;
use crate::config::TimerConfig;
use crate::convert::Converter;
use crate::drift::DriftCompensator;
use crate::error::TimeError;
use crate::gate::{LowPowerGate, PowerState};
use crate::scheduler::{AlarmContext, Scheduler};
use crate::signal::AlarmSignal;
use crate::temperature::CrystalModel;

/// Invoked once per expired timeout
pub type AlarmCallback = fn();

/// Seconds since January 1st of year 0, century 0, plus the millisecond
/// within the current second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    pub seconds: u64,
    pub milliseconds: u16,
}

pub struct TimerEngine<'a, R, B> {
    clock: RtcClock<R>,
    scheduler: Scheduler,
    drift: DriftCompensator,
    calibrator: WakeCalibrator,
    gate: LowPowerGate,
    crystal: CrystalModel,
    board: B,
    signal: &'a AlarmSignal,
    callback: Option<AlarmCallback>,
    config: TimerConfig,
    calibrating: bool,
}

impl<'a, R: HardwareRtc, B: LowPowerBoard> TimerEngine<'a, R, B> {
    pub fn new(
        rtc: R,
        board: B,
        signal: &'a AlarmSignal,
        config: TimerConfig,
    ) -> Result<Self, TimeError> {
        config.validate()?;
        let converter = Converter::new(&config);

        Ok(Self {
            clock: RtcClock::new(rtc, converter),
            scheduler: Scheduler::new(config.min_timeout_ticks),
            drift: DriftCompensator::new(converter.ratio().den),
            calibrator: WakeCalibrator::new(),
            gate: LowPowerGate::new(),
            crystal: CrystalModel::new(),
            board,
            signal,
            callback: None,
            config,
            calibrating: false,
        })
    }

    pub fn with_crystal_model(mut self, crystal: CrystalModel) -> Self {
        self.crystal = crystal;
        self
    }

    pub fn set_callback(&mut self, callback: AlarmCallback) {
        self.callback = Some(callback);
    }

    /// Initialise the RTC and measure the wake-up latency
    ///
    /// Calibration sleeps through one `calibration_timeout_ms` alarm, so
    /// this blocks for about a second on first boot.
    pub fn init(&mut self) -> Result<(), TimeError> {
        self.clock
            .rtc_mut()
            .init()
            .map_err(|_| TimeError::RtcInit)?;

        let now = self.clock.snapshot();
        if !calendar::is_valid(&now, self.config.ticks_per_second) {
            error!("RTC calendar corrupted: {}", now);
            return Err(TimeError::InvalidCalendar);
        }
        info!(
            "rtc initialised, {} ticks/s",
            self.config.ticks_per_second
        );

        self.calibrate_wake_latency()
    }

    fn calibrate_wake_latency(&mut self) -> Result<(), TimeError> {
        if self.calibrator.is_calibrated() {
            return Ok(());
        }

        let ticks = self
            .clock
            .converter()
            .ms_to_ticks(self.config.calibration_timeout_ms)
            .ticks;
        self.gate.set_event_allows_low_power(true);
        self.calibrating = true;
        self.scheduler.arm(&mut self.clock, ticks, self.signal)?;

        while !self.calibrator.is_calibrated() {
            self.enter_low_power_if_allowed();
            self.process();
        }
        Ok(())
    }

    /// Arm the alarm `timeout_ms` from now, replacing any pending one
    ///
    /// A fire of the replaced alarm that was not processed yet is dropped.
    /// The wake-up latency is subtracted from timeouts long enough to sleep
    /// through, and the rounding error of the conversion is carried over to
    /// later timeouts.
    ///
    /// # Panics
    ///
    /// If the RTC rejects the alarm. With a single alarm comparator there
    /// is no other wake source to fall back on.
    pub fn set_timeout(&mut self, timeout_ms: u32) {
        let adjusted = self
            .calibrator
            .adjust_timeout(timeout_ms, self.config.low_power_floor_ms);
        self.gate
            .set_event_allows_low_power(adjusted.allows_low_power);

        let converted = self.clock.converter().ms_to_ticks(adjusted.timeout_ms);
        let ticks = self.drift.compensate(converted);

        if let Err(e) = self.scheduler.arm(&mut self.clock, ticks, self.signal) {
            fatal(e);
        }
    }

    /// Handle a fired alarm, if any
    ///
    /// Runs, in order: clock resync, first-boot calibration, gate release
    /// and the application callback. Returns `true` when a timeout expired.
    /// Intermediate segments of a chained alarm are re-armed silently and
    /// return `false`.
    pub fn process(&mut self) -> bool {
        if self.signal.take() == 0 {
            return false;
        }

        self.board.resync_clock();
        self.clock.rtc_mut().deactivate_alarm();

        if !self.calibrator.is_calibrated() {
            let alarm = self.clock.alarm();
            let now = self.clock.snapshot();
            self.calibrator
                .calibrate(self.clock.converter(), &alarm, &now);
        }

        match self.scheduler.continue_chain(&mut self.clock) {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => fatal(e),
        }

        self.gate.unblock(&mut self.board);

        if core::mem::take(&mut self.calibrating) {
            return true;
        }
        if let Some(callback) = self.callback {
            callback();
        }
        true
    }

    /// Idle hook, enters STOP when the gate allows it
    ///
    /// Returns `true` if the MCU actually slept. Nothing happens while an
    /// alarm fire is waiting for [`Self::process`]. A wake without a pending
    /// alarm is recorded so the next timeout gets the latency credited back.
    pub fn enter_low_power_if_allowed(&mut self) -> bool {
        let slept = self
            .gate
            .enter_low_power_if_allowed(&mut self.board, self.signal);
        if slept && !self.signal.is_pending() {
            debug!("woken up by something other than the alarm");
            self.calibrator.note_unscheduled_wake();
        }
        slept
    }

    /// `true` vetoes STOP mode, `false` lifts the veto and resyncs the clock
    pub fn block_low_power_during_task(&mut self, block: bool) {
        if block {
            self.gate.block();
        } else {
            self.gate.unblock(&mut self.board);
        }
    }

    pub fn may_enter_low_power(&self) -> bool {
        self.gate.may_enter_low_power()
    }

    pub fn power_state(&self) -> PowerState {
        self.gate.state()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_calibrated()
    }

    pub fn wake_latency_ms(&self) -> u32 {
        self.calibrator.latency_ms()
    }

    pub fn alarm_context(&self) -> Option<&AlarmContext> {
        self.scheduler.context()
    }

    /// Stable hardware calendar with the century applied
    pub fn calendar(&mut self) -> CalendarSnapshot {
        self.clock.snapshot()
    }

    /// Current timer value in ms
    ///
    /// Wraps with the 32-bit tick counter, see [`Self::wrap_ms`].
    pub fn timer_value_ms(&mut self) -> u32 {
        let ticks = self.clock.now_ticks();
        self.clock.converter().ticks_to_ms(ticks as u64) as u32
    }

    /// Period of [`Self::timer_value_ms`]
    pub fn wrap_ms(&self) -> u64 {
        self.clock.converter().wrap_ms()
    }

    /// ms since `timestamp`, a previous [`Self::timer_value_ms`]
    ///
    /// A zero timestamp yields zero. Timestamps beyond [`Self::wrap_ms`] are
    /// reduced modulo the wrap first.
    pub fn elapsed_ms(&mut self, timestamp: u32) -> u32 {
        if timestamp == 0 {
            return 0;
        }

        let wrap = self.wrap_ms();
        let now = self.timer_value_ms() as u64;
        let timestamp = timestamp as u64 % wrap;
        ((now + wrap - timestamp) % wrap) as u32
    }

    /// Timer value `delta_ms` from now
    pub fn future_event_ms(&mut self, delta_ms: u32) -> u32 {
        let now = self.timer_value_ms() as u64;
        ((now + delta_ms as u64) % self.wrap_ms()) as u32
    }

    /// ms since the alarm was last armed
    pub fn elapsed_alarm_ms(&mut self) -> u32 {
        let ticks = self.scheduler.elapsed_since_last_arm(&mut self.clock);
        self.clock.converter().ticks_to_ms(ticks as u64) as u32
    }

    pub fn minimum_timeout_ticks(&self) -> u32 {
        self.scheduler.min_ticks()
    }

    pub fn ms_to_ticks(&self, ms: u32) -> u64 {
        self.clock.converter().ms_to_ticks(ms).ticks
    }

    pub fn ticks_to_ms(&self, ticks: u64) -> u64 {
        self.clock.converter().ticks_to_ms(ticks)
    }

    /// Busy-wait on the RTC
    pub fn delay_ms(&mut self, ms: u32) {
        let ticks = self.ms_to_ticks(ms);
        let start = self.clock.now_ticks();
        while (self.clock.now_ticks().wrapping_sub(start) as u64) < ticks {}
    }

    pub fn calendar_time(&mut self) -> CalendarTime {
        let now = self.clock.snapshot();
        let converter = self.clock.converter();
        let subticks = converter
            .resolution()
            .saturating_sub(1)
            .saturating_sub(now.subsecond as u32);

        CalendarTime {
            seconds: converter.to_seconds(&now),
            milliseconds: converter.ticks_to_ms(subticks as u64) as u16,
        }
    }

    /// Keep two words across resets in the RTC backup domain
    pub fn backup_write(&mut self, data0: u32, data1: u32) {
        critical_section::with(|_| self.clock.rtc_mut().write_backup([data0, data1]));
    }

    pub fn backup_read(&mut self) -> (u32, u32) {
        let [data0, data1] = critical_section::with(|_| self.clock.rtc_mut().read_backup());
        (data0, data1)
    }

    /// `period_ms` corrected for the crystal drift at `centi_celsius`
    pub fn temperature_compensation(&self, period_ms: u32, centi_celsius: i32) -> u32 {
        self.crystal.compensate(period_ms, centi_celsius)
    }
}

fn fatal(e: TimeError) -> ! {
    error!("fatal timer error: {}", e);
    panic!("{}", e)
}
