//! STOP mode entry and clock recovery for the Feather STM32F405
//!
//! STOP turns off the HSE and the PLL; the core resumes on the 16 MHz HSI.
//! [`FeatherBoard::resync_clock`] brings the 84 MHz PLL clock back.

use cortex_m::peripheral::SCB;
use defmt::trace;
use embassy_stm32::gpio::Output;
use hal_abstractions::LowPowerBoard;
use stm32_metapac as pac;
use stm32_metapac::pwr::vals::Pdds;
use stm32_metapac::rcc::vals::Sw;

pub struct FeatherBoard {
    scb: SCB,
    led: Output<'static>,
    led_was_on: bool,
}

impl FeatherBoard {
    pub fn new(scb: SCB, led: Output<'static>) -> Self {
        Self {
            scb,
            led,
            led_was_on: false,
        }
    }
}

impl LowPowerBoard for FeatherBoard {
    fn deinit_peripherals(&mut self) {
        self.led_was_on = self.led.is_set_high();
        self.led.set_low();
    }

    fn reinit_peripherals(&mut self) {
        if self.led_was_on {
            self.led.set_high();
        }
    }

    fn resync_clock(&mut self) {
        if pac::RCC.cfgr().read().sws() != Sw::HSI {
            return;
        }

        pac::RCC.cr().modify(|w| w.set_hseon(true));
        while !pac::RCC.cr().read().hserdy() {}

        pac::RCC.cr().modify(|w| w.set_pllon(true));
        while !pac::RCC.cr().read().pllrdy() {}

        pac::RCC.cfgr().modify(|w| w.set_sw(Sw::PLL1_P));
        while pac::RCC.cfgr().read().sws() != Sw::PLL1_P {}
        trace!("clock resynced to PLL");
    }

    fn clear_wake_flag(&mut self) {
        pac::PWR.cr1().modify(|w| w.set_cwuf(true));
    }

    fn enter_stop(&mut self) {
        // low-power regulator, flash powered down, STOP rather than STANDBY
        pac::PWR.cr1().modify(|w| {
            w.set_pdds(Pdds::STOP_MODE);
            w.set_lpds(true);
            w.set_fpds(true);
        });

        self.scb.set_sleepdeep();
        cortex_m::asm::dsb();
        cortex_m::asm::wfi();
        self.scb.clear_sleepdeep();
    }
}
