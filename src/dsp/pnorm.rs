// Automatic power normalization ahead of the correlator.
//
// Keeps one exponentially-weighted estimate of instantaneous power and
// scales every sample by 1/sqrt(estimate) toward NOMINAL_POWER. Isolated
// impulses that survive the gain stage are blanked to zero so they cannot
// poison the correlation window.

use crate::dsp::Iq;
use crate::utils::consts::{
    IMPULSE_BLANK_RATIO, IQ_SAT, NOMINAL_POWER, PNORM_ALPHA, PNORM_MAX_GAIN, PNORM_MIN_GAIN,
};

pub struct PowerNormalizer {
    est: f64,
    hold: bool,
    min_gain: f64,
    max_gain: f64,
}

impl PowerNormalizer {
    pub fn new() -> Self {
        Self::with_gain_limits(PNORM_MIN_GAIN, PNORM_MAX_GAIN)
    }

    pub fn with_gain_limits(min_gain: f64, max_gain: f64) -> Self {
        Self {
            // start at the target so the initial gain is unity
            est: NOMINAL_POWER,
            hold: false,
            min_gain,
            max_gain,
        }
    }

    /// Freeze (or unfreeze) the power estimate. The PHY holds the gain
    /// while a frame is being demodulated so the payload does not ride a
    /// moving gain curve.
    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Normalize `samples` in place.
    pub fn process(&mut self, samples: &mut [Iq]) {
        self.process_traced(samples, None, None);
    }

    /// Normalize `samples` in place, optionally recording the per-sample
    /// power estimate and applied gain (debug instrumentation).
    pub fn process_traced(
        &mut self,
        samples: &mut [Iq],
        mut est_trace: Option<&mut Vec<f64>>,
        mut gain_trace: Option<&mut Vec<f64>>,
    ) {
        let blank_threshold = IMPULSE_BLANK_RATIO * NOMINAL_POWER;

        for sample in samples.iter_mut() {
            if !self.hold {
                self.est += PNORM_ALPHA * (sample.power() - self.est);
                if self.est < 1.0 {
                    self.est = 1.0;
                }
            }

            let gain = (NOMINAL_POWER / self.est)
                .sqrt()
                .clamp(self.min_gain, self.max_gain);

            let i = (sample.i as f64 * gain)
                .round()
                .clamp(-(IQ_SAT as f64), IQ_SAT as f64) as i16;
            let q = (sample.q as f64 * gain)
                .round()
                .clamp(-(IQ_SAT as f64), IQ_SAT as f64) as i16;

            let scaled = Iq::new(i, q);
            *sample = if scaled.power() > blank_threshold {
                Iq::ZERO
            } else {
                scaled
            };

            if let Some(trace) = est_trace.as_deref_mut() {
                trace.push(self.est);
            }
            if let Some(trace) = gain_trace.as_deref_mut() {
                trace.push(gain);
            }
        }
    }
}

impl Default for PowerNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
