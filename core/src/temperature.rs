//! Temperature compensation of the 32.768 kHz crystal
//!
//! Tuning-fork crystals follow a parabola around their turnover
//! temperature: `drift_ppm = k * (T - T0)^2`. The model below uses the
//! worst-case coefficient (`k` widened by its tolerance) and the turnover
//! temperature shifted by its tolerance.
//!
//! Fixed-point units: coefficients in 1e-4 ppm/°C², temperatures in
//! hundredths of a degree.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrystalModel {
    /// Parabolic coefficient, 1e-4 ppm/°C²
    pub coefficient: i32,
    /// Tolerance of `coefficient`, 1e-4 ppm/°C²
    pub coefficient_deviation: i32,
    /// Turnover temperature, centi-°C
    pub turnover: i32,
    /// Tolerance of `turnover`, centi-°C
    pub turnover_deviation: i32,
}

impl CrystalModel {
    /// -0.035 ppm/°C² ± 0.0035, turnover 25 °C ± 5
    pub const fn new() -> Self {
        Self {
            coefficient: -350,
            coefficient_deviation: 35,
            turnover: 2500,
            turnover_deviation: 500,
        }
    }

    /// Worst-case coefficient, 1e-4 ppm/°C²
    fn worst_case_coefficient(&self) -> i128 {
        if self.coefficient < 0 {
            (self.coefficient - self.coefficient_deviation) as i128
        } else {
            (self.coefficient + self.coefficient_deviation) as i128
        }
    }

    /// Correct `period` for the crystal drift at `centi_celsius`
    ///
    /// The drift is rounded down. A result that would be negative returns
    /// `period` unchanged.
    pub fn compensate(&self, period: u32, centi_celsius: i32) -> u32 {
        let delta = (centi_celsius - (self.turnover - self.turnover_deviation)) as i128;
        // 1e-4 (coefficient) * 1e-4 (delta^2) * 1e-6 (ppm)
        let scaled = period as i128 * self.worst_case_coefficient() * delta * delta;
        let drift = scaled.div_euclid(100_000_000_000_000);

        let compensated = period as i128 + drift;
        if compensated < 0 {
            period
        } else {
            compensated.min(u32::MAX as i128) as u32
        }
    }
}

impl Default for CrystalModel {
    fn default() -> Self {
        Self::new()
    }
}
