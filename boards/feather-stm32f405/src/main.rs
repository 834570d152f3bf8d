#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use core::sync::atomic::{AtomicU32, Ordering};

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtc_timekeeper::AlarmSignal;
use rtic::app;

mod power;
mod rtc;

/// Raised by the RTC alarm interrupt, consumed by the idle loop
static ALARM_SIGNAL: AlarmSignal = AlarmSignal::new();

/// Expired heartbeat timeouts
static HEARTBEATS: AtomicU32 = AtomicU32::new(0);

/// Heartbeat period
const HEARTBEAT_MS: u32 = 5_000;

fn on_heartbeat() {
    HEARTBEATS.fetch_add(1, Ordering::Relaxed);
}

#[app(device = embassy_stm32, peripherals = true)]
mod app {
    use super::*;
    use defmt::{error, info};
    use embassy_stm32::gpio::{Level, Output, Speed};
    use embassy_stm32::rcc::{Hse, HseMode, LsConfig, LseConfig, LseMode};
    use embassy_stm32::time::Hertz;
    use rtc_timekeeper::{TimerConfig, TimerEngine};

    use crate::power::FeatherBoard;
    use crate::rtc::{self, StmRtc};

    type Engine = TimerEngine<'static, StmRtc, FeatherBoard>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        engine: Engine,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        info!("RTC timekeeper starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE, 32.768 kHz LSE (PC14/PC15)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        config.rcc.ls = LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz(32_768),
                mode: LseMode::Oscillator(embassy_stm32::rcc::LseDrive::MediumHigh),
            }),
        };

        let p = embassy_stm32::init(config);
        info!("System initialized with HSE (12MHz) and LSE (32.768kHz)");

        let led = Output::new(p.PC1, Level::Low, Speed::Low);
        let board = FeatherBoard::new(cx.core.SCB, led);
        let timer_config = TimerConfig::new(rtc::SYNC_PRESCALER as u32);

        let engine = match TimerEngine::new(StmRtc::new(p.RTC), board, &ALARM_SIGNAL, timer_config)
        {
            Ok(engine) => engine,
            Err(e) => {
                error!("invalid timer configuration: {}", e);
                panic!("timer configuration");
            }
        };

        (Shared {}, Local { engine })
    }

    /// RTC alarm A, via EXTI line 17
    ///
    /// Only acknowledges the hardware and raises the signal; the idle loop
    /// does the rest once the clock is back.
    #[task(binds = RTC_ALARM, priority = 2)]
    fn rtc_alarm(_cx: rtc_alarm::Context) {
        rtc::clear_alarm_flag();
        ALARM_SIGNAL.raise();
    }

    /// Timer dispatch and STOP mode entry
    #[idle(local = [engine])]
    fn idle(cx: idle::Context) -> ! {
        let engine = cx.local.engine;

        if let Err(e) = engine.init() {
            error!("RTC initialisation failed: {}", e);
            panic!("RTC initialisation");
        }
        info!("Wake-up latency: {} ms", engine.wake_latency_ms());

        engine.set_callback(on_heartbeat);
        engine.set_timeout(HEARTBEAT_MS);

        loop {
            if engine.process() {
                let now = engine.calendar();
                info!(
                    "Heartbeat {} at {:02}:{:02}:{:02}",
                    HEARTBEATS.load(Ordering::Relaxed),
                    now.hour,
                    now.minute,
                    now.second
                );
                engine.set_timeout(HEARTBEAT_MS);
            }
            engine.enter_low_power_if_allowed();
        }
    }
}
