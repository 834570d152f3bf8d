//! STOP mode gate
//!
//! STOP is only entered when no task holds a veto and the pending event is
//! far enough away to be worth the wake-up cost.

use hal_abstractions::LowPowerBoard;

use crate::signal::AlarmSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LowPowerGate {
    event_allows_low_power: bool,
    blocked_by_task: bool,
    state: PowerState,
}

impl LowPowerGate {
    pub const fn new() -> Self {
        Self {
            event_allows_low_power: false,
            blocked_by_task: false,
            state: PowerState::Running,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Veto STOP mode until [`unblock`](Self::unblock)
    pub fn block(&mut self) {
        self.blocked_by_task = true;
    }

    /// Lift the veto and make sure the core runs from the full-speed clock
    pub fn unblock<B: LowPowerBoard>(&mut self, board: &mut B) {
        self.blocked_by_task = false;
        board.resync_clock();
    }

    pub fn set_event_allows_low_power(&mut self, allows: bool) {
        self.event_allows_low_power = allows;
    }

    pub fn may_enter_low_power(&self) -> bool {
        !self.blocked_by_task && self.event_allows_low_power
    }

    /// Enter STOP if allowed, returns once an interrupt has woken the MCU
    ///
    /// Returns `false` without touching the board when STOP is not allowed
    /// or an alarm fire is still waiting to be processed. The pending check
    /// and the STOP entry share one critical section: an alarm raised in
    /// between stays pending in the NVIC and ends the WFI immediately. Its
    /// handler runs once the section is left.
    pub fn enter_low_power_if_allowed<B: LowPowerBoard>(
        &mut self,
        board: &mut B,
        signal: &AlarmSignal,
    ) -> bool {
        if !self.may_enter_low_power() {
            return false;
        }

        critical_section::with(|_| {
            if signal.is_pending() {
                return false;
            }

            board.deinit_peripherals();
            board.clear_wake_flag();

            #[allow(unused_assignments)]
            {
                self.state = PowerState::Stopped;
            }
            board.enter_stop();
            self.state = PowerState::Running;

            board.reinit_peripherals();
            board.resync_clock();
            true
        })
    }
}

impl Default for LowPowerGate {
    fn default() -> Self {
        Self::new()
    }
}
