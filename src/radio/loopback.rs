// In-process simulated channel: two endpoints whose transmit bursts appear
// in the peer's receive stream, embedded in low-level noise. Used by the
// integration tests and the demo binary; real deployments plug an SDR
// behind the RadioTx/RadioRx traits instead.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dsp::Iq;
use crate::radio::{RadioError, RadioRx, RadioTx, RxMeta};

/// How long the receive side waits for airborne samples before padding the
/// rest of the block with noise.
const IDLE_WAIT: Duration = Duration::from_millis(5);

pub struct LoopbackTx {
    air: Sender<Vec<Iq>>,
}

pub struct LoopbackRx {
    air: Receiver<Vec<Iq>>,
    /// Burst samples not yet handed out in a block
    pending: Vec<Iq>,
    pending_pos: usize,
    clock: u64,
    noise_amplitude: i16,
    rng: StdRng,
}

/// Build one simulated direction: everything sent on the returned `LoopbackTx`
/// shows up in the `LoopbackRx` stream.
pub fn channel(noise_amplitude: i16) -> (LoopbackTx, LoopbackRx) {
    let (tx, rx) = unbounded();
    (
        LoopbackTx { air: tx },
        LoopbackRx {
            air: rx,
            pending: Vec::new(),
            pending_pos: 0,
            clock: 0,
            noise_amplitude,
            rng: StdRng::seed_from_u64(0x0DD5_EED5),
        },
    )
}

/// Build a full-duplex pair of endpoints: `a` transmits into `b`'s receive
/// stream and vice versa. Returns `((a_tx, a_rx), (b_tx, b_rx))`.
pub fn duplex_pair(
    noise_amplitude: i16,
) -> ((LoopbackTx, LoopbackRx), (LoopbackTx, LoopbackRx)) {
    let (a_tx, b_rx) = channel(noise_amplitude);
    let (b_tx, a_rx) = channel(noise_amplitude);
    ((a_tx, a_rx), (b_tx, b_rx))
}

impl RadioTx for LoopbackTx {
    fn transmit_burst(&mut self, samples: &[Iq]) -> Result<(), RadioError> {
        self.air
            .send(samples.to_vec())
            .map_err(|_| RadioError::Closed)
    }
}

impl LoopbackRx {
    fn noise_sample(&mut self) -> Iq {
        if self.noise_amplitude == 0 {
            return Iq::ZERO;
        }
        let a = self.noise_amplitude;
        Iq::new(
            self.rng.random_range(-a..=a),
            self.rng.random_range(-a..=a),
        )
    }
}

impl RadioRx for LoopbackRx {
    fn receive_block(&mut self, buf: &mut [Iq]) -> Result<RxMeta, RadioError> {
        let timestamp = self.clock;
        let mut filled = 0usize;

        while filled < buf.len() {
            // drain any burst currently on the air
            if self.pending_pos < self.pending.len() {
                let take = (self.pending.len() - self.pending_pos).min(buf.len() - filled);
                buf[filled..filled + take]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + take]);
                self.pending_pos += take;
                filled += take;
                continue;
            }

            match self.air.recv_timeout(IDLE_WAIT) {
                Ok(burst) => {
                    self.pending = burst;
                    self.pending_pos = 0;
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    // nothing on the air: pad the rest with channel noise
                    for slot in buf[filled..].iter_mut() {
                        *slot = self.noise_sample();
                    }
                    filled = buf.len();
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    // peer gone; keep producing noise so the session can
                    // still time out gracefully
                    for slot in buf[filled..].iter_mut() {
                        *slot = self.noise_sample();
                    }
                    filled = buf.len();
                }
            }
        }

        self.clock += buf.len() as u64;
        Ok(RxMeta {
            timestamp,
            overrun: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_travels_to_peer() {
        let ((mut a_tx, _a_rx), (_b_tx, mut b_rx)) = duplex_pair(0);

        let burst: Vec<Iq> = (0..100i16).map(|n| Iq::new(n, -n)).collect();
        a_tx.transmit_burst(&burst).unwrap();

        let mut block = vec![Iq::ZERO; 256];
        let meta = b_rx.receive_block(&mut block).unwrap();
        assert_eq!(meta.timestamp, 0);
        assert!(!meta.overrun);
        assert_eq!(&block[..100], &burst[..]);
        assert!(block[100..].iter().all(|&s| s == Iq::ZERO));
    }

    #[test]
    fn test_timestamps_monotonic() {
        let (_tx, mut rx) = channel(3);
        let mut block = vec![Iq::ZERO; 128];

        let first = rx.receive_block(&mut block).unwrap();
        let second = rx.receive_block(&mut block).unwrap();
        assert_eq!(second.timestamp, first.timestamp + 128);
    }

    #[test]
    fn test_burst_spans_blocks() {
        let (mut tx, mut rx) = channel(0);
        let burst: Vec<Iq> = (0..300).map(|n| Iq::new(1, n as i16)).collect();
        tx.transmit_burst(&burst).unwrap();

        let mut block = vec![Iq::ZERO; 128];
        rx.receive_block(&mut block).unwrap();
        assert_eq!(&block[..], &burst[..128]);
        rx.receive_block(&mut block).unwrap();
        assert_eq!(&block[..], &burst[128..256]);
        rx.receive_block(&mut block).unwrap();
        assert_eq!(&block[..44], &burst[256..]);
    }
}
