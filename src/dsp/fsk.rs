// Continuous-phase FSK modulator/demodulator.
//
// Each bit (LSB first within a byte) emits SAMP_PER_SYMB samples; a '1' bit
// steps a phase pointer forward around a PHASE_TABLE_SIZE-point unit circle,
// a '0' bit steps it backward. Phase is continuous across symbol and byte
// boundaries, so the demodulator only needs the per-sample phase deltas.

use std::f64::consts::PI;

use crate::dsp::Iq;
use crate::utils::consts::{PHASE_TABLE_SIZE, SAMP_PER_SYMB, TX_AMPLITUDE};

/// CPFSK modulator with a precomputed phase table.
pub struct Modulator {
    table: [Iq; PHASE_TABLE_SIZE],
}

impl Modulator {
    pub fn new() -> Self {
        let mut table = [Iq::ZERO; PHASE_TABLE_SIZE];
        for (k, entry) in table.iter_mut().enumerate() {
            let angle = 2.0 * PI * k as f64 / PHASE_TABLE_SIZE as f64;
            *entry = Iq::new(
                (TX_AMPLITUDE * angle.cos()).round() as i16,
                (TX_AMPLITUDE * angle.sin()).round() as i16,
            );
        }
        Self { table }
    }

    /// Modulate `bytes` starting from phase index 0 (1 + 0j), appending
    /// SAMP_PER_SYMB samples per bit to `out`.
    pub fn modulate(&self, bytes: &[u8], out: &mut Vec<Iq>) {
        out.reserve(bytes.len() * 8 * SAMP_PER_SYMB);
        let mut idx = 0usize;
        for &byte in bytes {
            for bit in 0..8 {
                let step = if (byte >> bit) & 1 == 1 {
                    1
                } else {
                    PHASE_TABLE_SIZE - 1
                };
                for _ in 0..SAMP_PER_SYMB {
                    idx = (idx + step) % PHASE_TABLE_SIZE;
                    out.push(self.table[idx]);
                }
            }
        }
    }
}

impl Default for Modulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Demodulator state carried across calls so a frame can span multiple
/// receive blocks. Created once per link session and owned by the PHY
/// receive worker.
pub struct Demod {
    last_phase: f64,
    /// Accumulated phase delta of the symbol currently being demodulated
    acc: f64,
    /// Samples seen so far within the current symbol
    samp_in_symb: usize,
    /// Bits assembled so far into the current byte
    bit_in_byte: usize,
    byte: u8,
}

impl Demod {
    pub fn new() -> Self {
        Self {
            last_phase: 0.0,
            acc: 0.0,
            samp_in_symb: 0,
            bit_in_byte: 0,
            byte: 0,
        }
    }

    fn reset(&mut self) {
        self.last_phase = 0.0;
        self.acc = 0.0;
        self.samp_in_symb = 0;
        self.bit_in_byte = 0;
        self.byte = 0;
    }

    /// Demodulate up to `max_bytes` bytes from `samples`, appending them to
    /// `out`. Returns the number of samples consumed.
    ///
    /// With `new_signal == true` all carried state is discarded and the first
    /// sample becomes the phase reference (it emits no bit). With
    /// `new_signal == false` demodulation resumes exactly where the previous
    /// call stopped, mid-symbol or mid-byte.
    pub fn demodulate(
        &mut self,
        samples: &[Iq],
        new_signal: bool,
        max_bytes: usize,
        out: &mut Vec<u8>,
    ) -> usize {
        if new_signal {
            self.reset();
        }
        if max_bytes == 0 {
            return 0;
        }

        let mut produced = 0usize;
        let mut consumed = 0usize;

        for (n, &sample) in samples.iter().enumerate() {
            let phase = sample.phase();
            consumed = n + 1;

            if new_signal && n == 0 {
                // phase reference only
                self.last_phase = phase;
                self.samp_in_symb = 1;
                continue;
            }

            let mut delta = phase - self.last_phase;
            if delta > PI {
                delta -= 2.0 * PI;
            } else if delta < -PI {
                delta += 2.0 * PI;
            }
            self.acc += delta;
            self.last_phase = phase;
            self.samp_in_symb += 1;

            if self.samp_in_symb == SAMP_PER_SYMB {
                let bit = (self.acc > 0.0) as u8;
                self.byte |= bit << self.bit_in_byte;
                self.acc = 0.0;
                self.samp_in_symb = 0;
                self.bit_in_byte += 1;

                if self.bit_in_byte == 8 {
                    out.push(self.byte);
                    self.byte = 0;
                    self.bit_in_byte = 0;
                    produced += 1;
                    if produced == max_bytes {
                        break;
                    }
                }
            }
        }

        consumed
    }
}

impl Default for Demod {
    fn default() -> Self {
        Self::new()
    }
}
