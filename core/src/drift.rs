//! Rounding-drift compensation for ms -> tick conversion
//!
//! Each conversion rounds to the nearest tick and reports the signed
//! remainder in units of `1 / den` tick. The compensator sums those
//! remainders; whenever the sum reaches a whole tick the next timeout is
//! nudged by one tick in the matching direction. The running sum of
//! programmed ticks therefore never differs from the exact sum by more
//! than one tick.

use crate::convert::Ticks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriftCompensator {
    accumulated: i32,
    den: i32,
}

impl DriftCompensator {
    pub const fn new(den: u32) -> Self {
        Self {
            accumulated: 0,
            den: den as i32,
        }
    }

    /// Accumulated error, in units of `1 / den` tick
    pub fn accumulated(&self) -> i32 {
        self.accumulated
    }

    /// Add the signed remainder of the latest ms -> tick conversion
    pub fn record_rounding_error(&mut self, remainder: i32) {
        self.accumulated += remainder;
    }

    /// Fold one whole tick of accumulated error into `ticks`, if there is one
    pub fn maybe_correct(&mut self, ticks: u64) -> u64 {
        if self.accumulated >= self.den {
            self.accumulated -= self.den;
            trace!("drift: +1 tick, residual {}", self.accumulated);
            ticks + 1
        } else if self.accumulated <= -self.den && ticks > 0 {
            self.accumulated += self.den;
            trace!("drift: -1 tick, residual {}", self.accumulated);
            ticks - 1
        } else {
            ticks
        }
    }

    /// Record a conversion and return the ticks to program
    pub fn compensate(&mut self, converted: Ticks) -> u64 {
        self.record_rounding_error(converted.remainder);
        self.maybe_correct(converted.ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;
    use crate::convert::Converter;

    #[test]
    fn test_single_tick_correction() {
        let conv = Converter::new(&TimerConfig::default());
        let mut drift = DriftCompensator::new(conv.ratio().den);

        // 1 ms = 2.048 ticks, 0.048 * 21 > 1
        let mut programmed = 0u64;
        for _ in 0..20 {
            programmed += drift.compensate(conv.ms_to_ticks(1));
        }
        assert_eq!(programmed, 40);
        programmed += drift.compensate(conv.ms_to_ticks(1));
        assert_eq!(programmed, 43);
    }

    #[test]
    fn test_prefix_error_bounded() {
        let conv = Converter::new(&TimerConfig::default());
        let ratio = conv.ratio();
        let mut drift = DriftCompensator::new(ratio.den);

        let sequence = [1u32, 7, 121, 3, 999, 50, 5, 1, 1, 333, 62, 1000, 11];
        let mut exact_scaled = 0i64; // exact ticks * den
        let mut programmed = 0i64;
        for round in 0..50 {
            for &ms in &sequence {
                let ms = ms + round;
                exact_scaled += ms as i64 * ratio.num as i64;
                programmed += drift.compensate(conv.ms_to_ticks(ms)) as i64;
                let error = exact_scaled - programmed * ratio.den as i64;
                assert!(error.abs() < ratio.den as i64, "error {}", error);
            }
        }
    }

    #[test]
    fn test_negative_correction() {
        let conv = Converter::new(&TimerConfig::default());
        let mut drift = DriftCompensator::new(conv.ratio().den);
        // 121 ms = 247.808 ticks rounds up, remainder -24
        let mut programmed = 0u64;
        for _ in 0..5 {
            programmed += drift.compensate(conv.ms_to_ticks(121));
        }
        // -120 so far, no correction
        assert_eq!(programmed, 5 * 248);
        assert_eq!(drift.accumulated(), -120);
        programmed += drift.compensate(conv.ms_to_ticks(121));
        assert_eq!(programmed, 6 * 248 - 1);
        assert_eq!(drift.accumulated(), -144 + 125);
    }
}
