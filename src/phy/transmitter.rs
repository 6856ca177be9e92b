// Burst transmit path: one link frame in, one atomic on-air burst out.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;
use tracing::{debug, error, info};

use crate::dsp::Iq;
use crate::dsp::fsk::Modulator;
use crate::dsp::prbs::scramble_in_place;
use crate::radio::RadioTx;
use crate::utils::consts::{PREAMBLE, SAMP_PER_SYMB, TRAINING_SEQ, TX_AMPLITUDE};

/// Assemble the on-air waveform for one frame:
/// `[ramp-up][training][preamble][scrambled frame][ramp-down]`,
/// modulated as a single continuous-phase stream. The amplitude ramps taper
/// linearly to and from zero to keep spectral splatter off the burst edges.
pub fn build_burst(modulator: &Modulator, frame: &[u8], keystream: &[u8]) -> Vec<Iq> {
    let mut bytes = Vec::with_capacity(TRAINING_SEQ.len() + PREAMBLE.len() + frame.len());
    bytes.extend_from_slice(&TRAINING_SEQ);
    bytes.extend_from_slice(&PREAMBLE);
    let frame_start = bytes.len();
    bytes.extend_from_slice(frame);
    scramble_in_place(&mut bytes[frame_start..], keystream);

    let mut body = Vec::new();
    modulator.modulate(&bytes, &mut body);

    let mut burst = Vec::with_capacity(body.len() + 2 * SAMP_PER_SYMB);

    // ramp up along the (1, 0) axis the modulation starts from
    for k in 0..SAMP_PER_SYMB {
        let amp = TX_AMPLITUDE * (k + 1) as f64 / (SAMP_PER_SYMB + 1) as f64;
        burst.push(Iq::new(amp.round() as i16, 0));
    }
    burst.extend_from_slice(&body);
    // taper back down holding the final phase
    if let Some(&last) = body.last() {
        let mag = last.power().sqrt().max(1.0);
        let (ui, uq) = (last.i as f64 / mag, last.q as f64 / mag);
        for k in (0..SAMP_PER_SYMB).rev() {
            let amp = TX_AMPLITUDE * (k + 1) as f64 / (SAMP_PER_SYMB + 1) as f64;
            burst.push(Iq::new((amp * ui).round() as i16, (amp * uq).round() as i16));
        }
    }

    burst
}

/// Long-running transmit worker: pulls frames from the link layer's handoff
/// slot and pushes fully formed bursts to the radio. Application-driven, so
/// blocking on an empty slot is fine; session shutdown wakes it by
/// disconnecting the channel.
pub struct PhyTransmitter<T: RadioTx> {
    radio: T,
    frames: Receiver<Vec<u8>>,
    keystream: Arc<Vec<u8>>,
    stop: Arc<AtomicBool>,
    modulator: Modulator,
}

impl<T: RadioTx> PhyTransmitter<T> {
    pub fn new(
        radio: T,
        frames: Receiver<Vec<u8>>,
        keystream: Arc<Vec<u8>>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            radio,
            frames,
            keystream,
            stop,
            modulator: Modulator::new(),
        }
    }

    pub fn run(mut self) {
        info!("phy-tx worker up");
        loop {
            let frame = match self.frames.recv() {
                Ok(frame) => frame,
                Err(_) => break,
            };
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            let burst = build_burst(&self.modulator, &frame, &self.keystream);
            debug!(
                "transmitting burst: {} frame bytes, {} samples",
                frame.len(),
                burst.len()
            );
            if let Err(e) = self.radio.transmit_burst(&burst) {
                error!("burst transmit failed: {e}");
                break;
            }
        }
        info!("phy-tx worker down");
    }
}
