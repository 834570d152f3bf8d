//! STM32F4 RTC driver for the timer engine
//!
//! Register-level access to the calendar and alarm A. The calendar is read
//! with shadow registers bypassed, so a single sample may mix two seconds;
//! the engine double-samples on top of [`StmRtc::calendar`].
//!
//! Prescalers: LSE 32.768 kHz / 16 (PREDIV_A + 1) / 2048 (PREDIV_S + 1).

use defmt::{info, Format};
use embassy_stm32::peripherals::RTC;
use embassy_stm32::Peri;
use hal_abstractions::{AlarmTime, CalendarSnapshot, HardwareRtc};
use stm32_metapac as pac;
use stm32_metapac::rtc::vals::{AlrmrMsk, AlrmrPm, AlrmrWdsel, Key};

/// `PREDIV_A + 1`
const ASYNC_PRESCALER: u8 = 16;
/// `PREDIV_S + 1`, also the engine's ticks per second
pub const SYNC_PRESCALER: u16 = 2048;

/// Marks a calendar that survived a reset, kept in BKP0R
const BACKUP_MAGIC: u32 = 0x32F2;

/// Application words, BKP1R and BKP2R
const BACKUP_DATA_REGISTERS: [usize; 2] = [1, 2];

/// EXTI line wired to the RTC alarm
const ALARM_EXTI_LINE: usize = 17;

/// Bounded wait on RTC status flags, in polls
const FLAG_TIMEOUT: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum RtcError {
    /// INITF never set
    InitTimeout,
    /// ALRAWF never set
    AlarmWriteTimeout,
}

pub struct StmRtc {
    _rtc: Peri<'static, RTC>,
}

impl StmRtc {
    /// Take ownership of the RTC. The backup domain and LSE must already be
    /// configured by `embassy_stm32::init`.
    pub fn new(rtc: Peri<'static, RTC>) -> Self {
        Self { _rtc: rtc }
    }

    fn unlock() {
        pac::RTC.wpr().write(|w| w.set_key(Key::DEACTIVATE1));
        pac::RTC.wpr().write(|w| w.set_key(Key::DEACTIVATE2));
    }

    fn lock() {
        pac::RTC.wpr().write(|w| w.set_key(Key::ACTIVATE));
    }

    fn wait_for(flag: impl Fn() -> bool) -> bool {
        (0..FLAG_TIMEOUT).any(|_| flag())
    }

    /// Reset the calendar to 2000-01-01 00:00:00, Saturday
    fn set_epoch(&mut self) -> Result<(), RtcError> {
        pac::RTC.isr().modify(|w| w.set_init(true));
        if !Self::wait_for(|| pac::RTC.isr().read().initf()) {
            return Err(RtcError::InitTimeout);
        }

        pac::RTC.prer().write(|w| {
            w.set_prediv_s(SYNC_PRESCALER - 1);
            w.set_prediv_a(ASYNC_PRESCALER - 1);
        });
        pac::RTC.tr().write(|w| w.set_pm(false));
        pac::RTC.dr().write(|w| {
            w.set_yt(0);
            w.set_yu(0);
            w.set_mt(false);
            w.set_mu(1);
            w.set_dt(0);
            w.set_du(1);
            w.set_wdu(6);
        });

        pac::RTC.isr().modify(|w| w.set_init(false));
        pac::RTC.bkpr(0).write(|w| w.set_bkp(BACKUP_MAGIC));
        Ok(())
    }
}

/// Clear the alarm flag and its EXTI line, called from the alarm interrupt
pub fn clear_alarm_flag() {
    pac::RTC.isr().modify(|w| w.set_alrf(0, false));
    pac::EXTI.pr(0).write(|w| w.set_line(ALARM_EXTI_LINE, true));
}

fn bcd(tens: u8, units: u8) -> u8 {
    tens * 10 + units
}

fn split_bcd(value: u8) -> (u8, u8) {
    (value / 10, value % 10)
}

impl HardwareRtc for StmRtc {
    type Error = RtcError;

    fn init(&mut self) -> Result<(), Self::Error> {
        pac::PWR.cr1().modify(|w| w.set_dbp(true));
        Self::unlock();

        let result = if pac::RTC.bkpr(0).read().bkp() != BACKUP_MAGIC {
            info!("RTC calendar not set, starting from 2000-01-01");
            self.set_epoch()
        } else {
            Ok(())
        };

        pac::RTC.cr().modify(|w| w.set_bypshad(true));
        Self::lock();
        result?;

        // Alarm A reaches the NVIC through EXTI line 17, rising edge
        pac::EXTI
            .imr(0)
            .modify(|w| w.set_line(ALARM_EXTI_LINE, true));
        pac::EXTI
            .rtsr(0)
            .modify(|w| w.set_line(ALARM_EXTI_LINE, true));
        Ok(())
    }

    fn calendar(&mut self) -> CalendarSnapshot {
        let ss = pac::RTC.ssr().read().ss();
        let tr = pac::RTC.tr().read();
        let dr = pac::RTC.dr().read();

        CalendarSnapshot::new(
            bcd(dr.yt(), dr.yu()),
            bcd(dr.mt() as u8, dr.mu()),
            bcd(dr.dt(), dr.du()),
            bcd(tr.ht(), tr.hu()),
            bcd(tr.mnt(), tr.mnu()),
            bcd(tr.st(), tr.su()),
            ss,
        )
    }

    fn set_alarm(&mut self, at: &CalendarSnapshot) -> Result<(), Self::Error> {
        Self::unlock();
        pac::RTC.cr().modify(|w| {
            w.set_alre(0, false);
            w.set_alrie(0, false);
        });

        if !Self::wait_for(|| pac::RTC.isr().read().alrwf(0)) {
            Self::lock();
            return Err(RtcError::AlarmWriteTimeout);
        }

        let (dt, du) = split_bcd(at.day);
        let (ht, hu) = split_bcd(at.hour);
        let (mnt, mnu) = split_bcd(at.minute);
        let (st, su) = split_bcd(at.second);
        pac::RTC.alrmr(0).write(|w| {
            w.set_msk1(AlrmrMsk::TO_MATCH);
            w.set_msk2(AlrmrMsk::TO_MATCH);
            w.set_msk3(AlrmrMsk::TO_MATCH);
            w.set_msk4(AlrmrMsk::TO_MATCH);
            w.set_wdsel(AlrmrWdsel::DATE_UNITS);
            w.set_pm(AlrmrPm::AM);
            w.set_dt(dt);
            w.set_du(du);
            w.set_ht(ht);
            w.set_hu(hu);
            w.set_mnt(mnt);
            w.set_mnu(mnu);
            w.set_st(st);
            w.set_su(su);
        });
        // compare all 15 subsecond bits
        pac::RTC.alrmssr(0).write(|w| {
            w.set_ss(at.subsecond);
            w.set_maskss(15);
        });

        pac::RTC.isr().modify(|w| w.set_alrf(0, false));
        pac::RTC.cr().modify(|w| {
            w.set_alrie(0, true);
            w.set_alre(0, true);
        });
        Self::lock();
        Ok(())
    }

    fn deactivate_alarm(&mut self) {
        Self::unlock();
        pac::RTC.cr().modify(|w| {
            w.set_alre(0, false);
            w.set_alrie(0, false);
        });
        pac::RTC.isr().modify(|w| w.set_alrf(0, false));
        Self::lock();
    }

    fn alarm(&mut self) -> AlarmTime {
        let alrmr = pac::RTC.alrmr(0).read();
        AlarmTime {
            day: bcd(alrmr.dt(), alrmr.du()),
            hour: bcd(alrmr.ht(), alrmr.hu()),
            minute: bcd(alrmr.mnt(), alrmr.mnu()),
            second: bcd(alrmr.st(), alrmr.su()),
            subsecond: pac::RTC.alrmssr(0).read().ss(),
        }
    }

    fn write_backup(&mut self, data: [u32; 2]) {
        for (index, word) in BACKUP_DATA_REGISTERS.into_iter().zip(data) {
            pac::RTC.bkpr(index).write(|w| w.set_bkp(word));
        }
    }

    fn read_backup(&mut self) -> [u32; 2] {
        BACKUP_DATA_REGISTERS.map(|index| pac::RTC.bkpr(index).read().bkp())
    }
}
