pub mod correlator;
pub mod crc;
pub mod fir;
pub mod fsk;
pub mod pnorm;
pub mod prbs;

/// Fixed-point baseband IQ sample. The nominal ADC/DAC range is
/// [-2048, 2047]; the receive chain may scale up to [`IQ_SAT`]
/// (see `utils::consts`) before saturating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Iq {
    pub i: i16,
    pub q: i16,
}

impl Iq {
    pub const ZERO: Iq = Iq { i: 0, q: 0 };

    pub fn new(i: i16, q: i16) -> Self {
        Self { i, q }
    }

    /// Instantaneous power i^2 + q^2
    pub fn power(self) -> f64 {
        let i = self.i as f64;
        let q = self.q as f64;
        i * i + q * q
    }

    /// Quadrant-aware phase angle in (-pi, pi]
    pub fn phase(self) -> f64 {
        (self.q as f64).atan2(self.i as f64)
    }

    /// Complex conjugate
    pub fn conj(self) -> Self {
        Self { i: self.i, q: -self.q }
    }
}
