// Preamble cross-correlator.
//
// The reference is the modulated preamble, decimated and conjugated once at
// init. Incoming samples are decimated the same way into a double-buffered
// sliding window and dot-multiplied against the reference. Correlation power
// near the true alignment is not perfectly unimodal, so a candidate peak is
// only committed after CORR_COUNTDOWN further insertions fail to beat it.

use crate::dsp::Iq;
use crate::dsp::fsk::Modulator;
use crate::utils::consts::{CORR_COUNTDOWN, CORR_DECIMATION, NOMINAL_POWER, TX_AMPLITUDE};

pub struct Correlator {
    /// Conjugated, decimated reference waveform
    reference: Vec<Iq>,
    /// Double-length circular history; each decimated sample is written at
    /// two positions so the correlation window is always contiguous
    window: Vec<Iq>,
    pos: usize,
    decim_phase: usize,
    threshold: f64,
    max_power: f64,
    best_timestamp: u64,
    countdown: u32,
    armed: bool,
}

impl Correlator {
    /// Build a correlator for `reference_bytes` (the preamble pattern).
    pub fn new(modulator: &Modulator, reference_bytes: &[u8]) -> Self {
        let mut samples = Vec::new();
        modulator.modulate(reference_bytes, &mut samples);

        let reference: Vec<Iq> = samples
            .iter()
            .step_by(CORR_DECIMATION)
            .map(|s| s.conj())
            .collect();
        let len = reference.len();

        // An aligned window of normalized input (amplitude sqrt(NOMINAL_POWER))
        // against the full-amplitude reference yields a dot magnitude of
        // len * TX_AMPLITUDE * sqrt(NOMINAL_POWER); trigger at half of that.
        let aligned = len as f64 * TX_AMPLITUDE * NOMINAL_POWER.sqrt();
        let threshold = (0.5 * aligned) * (0.5 * aligned);

        Self {
            reference,
            window: vec![Iq::ZERO; 2 * len],
            pos: 0,
            decim_phase: 0,
            threshold,
            max_power: 0.0,
            best_timestamp: 0,
            countdown: 0,
            armed: false,
        }
    }

    /// Feed `samples` (first sample stamped `start_timestamp`, one tick per
    /// sample). Returns the timestamp of the best-aligned sample once a peak
    /// is finalized; internal state resets after every detection.
    pub fn process(&mut self, samples: &[Iq], start_timestamp: u64) -> Option<u64> {
        let len = self.reference.len();

        for (n, &sample) in samples.iter().enumerate() {
            self.decim_phase += 1;
            if self.decim_phase < CORR_DECIMATION {
                continue;
            }
            self.decim_phase = 0;

            self.window[self.pos] = sample;
            self.window[self.pos + len] = sample;
            self.pos = (self.pos + 1) % len;

            // oldest..newest is contiguous at [pos, pos + len)
            let mut re: i64 = 0;
            let mut im: i64 = 0;
            for (w, r) in self.window[self.pos..self.pos + len]
                .iter()
                .zip(&self.reference)
            {
                let (wi, wq) = (w.i as i64, w.q as i64);
                let (ri, rq) = (r.i as i64, r.q as i64);
                re += wi * ri - wq * rq;
                im += wi * rq + wq * ri;
            }
            let power = (re as f64) * (re as f64) + (im as f64) * (im as f64);

            if power > self.threshold && power > self.max_power {
                self.max_power = power;
                self.best_timestamp = start_timestamp + n as u64;
                self.countdown = CORR_COUNTDOWN;
                self.armed = true;
            } else if self.armed {
                self.countdown -= 1;
                if self.countdown == 0 {
                    let timestamp = self.best_timestamp;
                    self.reset();
                    return Some(timestamp);
                }
            }
        }

        None
    }

    pub fn reset(&mut self) {
        self.window.fill(Iq::ZERO);
        self.pos = 0;
        self.decim_phase = 0;
        self.max_power = 0.0;
        self.best_timestamp = 0;
        self.countdown = 0;
        self.armed = false;
    }
}
