// Continuous receive path: block receive -> channel filter -> power
// normalizer -> preamble correlation -> demodulation -> descramble -> copy.
//
// The worker never blocks on a slow consumer: a frame that finds the link
// slot still occupied is dropped, because samples keep arriving in real time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, error, info, trace, warn};

use crate::dsp::Iq;
use crate::dsp::correlator::Correlator;
use crate::dsp::fir::ChannelFilter;
use crate::dsp::fsk::{Demod, Modulator};
use crate::dsp::pnorm::PowerNormalizer;
use crate::dsp::prbs::scramble_in_place;
use crate::link::frame::FrameType;
use crate::radio::RadioRx;
use crate::utils::consts::{PREAMBLE, RX_BLOCK_SAMPLES};

enum RxState {
    /// Blocking receive of one hardware block
    Receive,
    /// Scan the un-consumed tail of the block for the preamble
    Correlate,
    /// Demodulate bytes toward the current target (type byte, then frame)
    Demod,
    /// Inspect the descrambled type byte to learn the frame length
    CheckType,
    /// Undo the whitening transform over the whole frame
    Decode,
    /// Hand the frame to the link layer (drop when the slot is full)
    Copy,
}

pub struct PhyReceiver<R: RadioRx> {
    radio: R,
    frames: Sender<Vec<u8>>,
    keystream: Arc<Vec<u8>>,
    stop: Arc<AtomicBool>,
    filter: ChannelFilter,
    pnorm: PowerNormalizer,
    correlator: Correlator,
    demod: Demod,
}

impl<R: RadioRx> PhyReceiver<R> {
    pub fn new(
        radio: R,
        frames: Sender<Vec<u8>>,
        keystream: Arc<Vec<u8>>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let modulator = Modulator::new();
        Self {
            radio,
            frames,
            keystream,
            stop,
            filter: ChannelFilter::new(),
            pnorm: PowerNormalizer::new(),
            correlator: Correlator::new(&modulator, &PREAMBLE),
            demod: Demod::new(),
        }
    }

    pub fn run(mut self) {
        info!("phy-rx worker up");

        let mut block = vec![Iq::ZERO; RX_BLOCK_SAMPLES];
        let mut block_ts = 0u64;
        let mut offset = 0usize;
        let mut state = RxState::Receive;
        // true while a frame is being demodulated across block boundaries
        let mut in_frame = false;
        let mut new_signal = true;
        // 0 until the type byte has revealed the frame length
        let mut frame_len = 0usize;
        let mut frame_buf: Vec<u8> = Vec::new();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            match state {
                RxState::Receive => {
                    let meta = match self.radio.receive_block(&mut block) {
                        Ok(meta) => meta,
                        Err(e) => {
                            error!("block receive failed: {e}");
                            break;
                        }
                    };
                    if meta.overrun {
                        warn!("rx overrun, discarding block");
                        continue;
                    }
                    self.filter.process(&mut block);
                    self.pnorm.process(&mut block);
                    block_ts = meta.timestamp;
                    offset = 0;
                    state = if in_frame {
                        RxState::Demod
                    } else {
                        RxState::Correlate
                    };
                }

                RxState::Correlate => {
                    match self
                        .correlator
                        .process(&block[offset..], block_ts + offset as u64)
                    {
                        Some(ts) => {
                            // ts is the best-aligned (last) preamble sample;
                            // demodulation starts there, using it as the
                            // phase reference
                            offset = match ts.checked_sub(block_ts) {
                                Some(rel) if (rel as usize) < block.len() => rel as usize,
                                _ => {
                                    debug!("correlation peak predates current block");
                                    offset
                                }
                            };
                            trace!(timestamp = ts, "preamble detected");
                            in_frame = true;
                            new_signal = true;
                            frame_len = 0;
                            frame_buf.clear();
                            self.pnorm.set_hold(true);
                            state = RxState::Demod;
                        }
                        None => state = RxState::Receive,
                    }
                }

                RxState::Demod => {
                    let target = if frame_len == 0 { 1 } else { frame_len };
                    let missing = target - frame_buf.len();
                    let consumed = self.demod.demodulate(
                        &block[offset..],
                        new_signal,
                        missing,
                        &mut frame_buf,
                    );
                    offset += consumed;
                    new_signal = false;
                    state = if frame_buf.len() < target {
                        // block exhausted mid-frame; the carried demodulator
                        // state resumes in the next block
                        RxState::Receive
                    } else if frame_len == 0 {
                        RxState::CheckType
                    } else {
                        RxState::Decode
                    };
                }

                RxState::CheckType => {
                    let tag = frame_buf[0] ^ self.keystream[0];
                    match FrameType::from_u8(tag) {
                        Ok(frame_type) => {
                            frame_len = frame_type.frame_size();
                            state = RxState::Demod;
                        }
                        Err(e) => {
                            debug!("frame rejected: {e}");
                            in_frame = false;
                            self.pnorm.set_hold(false);
                            state = RxState::Receive;
                        }
                    }
                }

                RxState::Decode => {
                    scramble_in_place(&mut frame_buf, &self.keystream);
                    state = RxState::Copy;
                }

                RxState::Copy => {
                    match self.frames.try_send(std::mem::take(&mut frame_buf)) {
                        Ok(()) => trace!("frame handed to link layer"),
                        Err(TrySendError::Full(_)) => {
                            warn!("link slot occupied, frame dropped")
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                    in_frame = false;
                    self.pnorm.set_hold(false);
                    // more of this block may hold another burst
                    state = if offset < block.len() {
                        RxState::Correlate
                    } else {
                        RxState::Receive
                    };
                }
            }
        }
        info!("phy-rx worker down");
    }
}
