// Sending side of the stop-and-wait ARQ: one frame in flight, retransmit on
// ack timeout or sequence mismatch, give up after a fixed retry budget. The
// sequence number only advances on a confirmed ack.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::link::frame::DataFrame;
use crate::link::{LinkError, session::LinkConfig};
use crate::utils::consts::PAYLOAD_SIZE;

pub struct LinkSender {
    /// User payloads awaiting transfer
    payloads: Receiver<Vec<u8>>,
    /// Per-payload transfer outcome, consumed by the user-facing send call
    results: Sender<Result<(), LinkError>>,
    /// Handoff slot into the PHY transmit worker
    phy_tx: Sender<Vec<u8>>,
    /// Ack numbers extracted by the link receive worker
    acks: Receiver<u16>,
    config: LinkConfig,
    stop: Arc<AtomicBool>,
    seq: u16,
}

impl LinkSender {
    pub fn new(
        payloads: Receiver<Vec<u8>>,
        results: Sender<Result<(), LinkError>>,
        phy_tx: Sender<Vec<u8>>,
        acks: Receiver<u16>,
        config: LinkConfig,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            payloads,
            results,
            phy_tx,
            acks,
            config,
            stop,
            seq: 0,
        }
    }

    pub fn run(mut self) {
        info!("link-tx worker up");
        loop {
            // blocking; session shutdown disconnects the channel
            let data = match self.payloads.recv() {
                Ok(data) => data,
                Err(_) => break,
            };
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            let result = self.send_data(&data);
            let fatal = matches!(result, Err(LinkError::Closed));
            let _ = self.results.send(result);
            if fatal {
                break;
            }
        }
        info!("link-tx worker down");
    }

    /// Transfer one user buffer, chunk by chunk, through the ARQ.
    fn send_data(&mut self, data: &[u8]) -> Result<(), LinkError> {
        for chunk in data.chunks(PAYLOAD_SIZE) {
            let frame = DataFrame::new(self.seq, chunk)?;
            self.send_frame(&frame)?;
            self.seq = self.seq.wrapping_add(1);
        }
        Ok(())
    }

    /// Transmit one frame until acked or the retry budget is spent.
    fn send_frame(&mut self, frame: &DataFrame) -> Result<(), LinkError> {
        let bytes = frame.to_bytes();

        for attempt in 1..=self.config.max_tries {
            // stale acks from an earlier frame must not confirm this one
            while self.acks.try_recv().is_ok() {}

            match self
                .phy_tx
                .send_timeout(bytes.clone(), self.config.ack_timeout)
            {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(seq = frame.seq, "phy transmit slot still busy");
                    continue;
                }
                Err(SendTimeoutError::Disconnected(_)) => return Err(LinkError::Closed),
            }
            debug!(seq = frame.seq, attempt, "data frame transmitted");

            match self.acks.recv_timeout(self.config.ack_timeout) {
                Ok(num) if num == frame.seq => {
                    debug!(seq = frame.seq, "ack confirmed");
                    return Ok(());
                }
                Ok(num) => {
                    debug!(seq = frame.seq, got = num, "ack sequence mismatch")
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!(seq = frame.seq, attempt, "ack timeout")
                }
                Err(RecvTimeoutError::Disconnected) => return Err(LinkError::Closed),
            }
        }

        warn!(
            seq = frame.seq,
            tries = self.config.max_tries,
            "retry budget exhausted"
        );
        Err(LinkError::NoConnection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;
    use std::time::Duration;

    fn test_config() -> LinkConfig {
        LinkConfig {
            ack_timeout: Duration::from_millis(50),
            ..LinkConfig::default()
        }
    }

    #[test]
    fn test_retry_budget_is_exact() {
        let (_payload_s, payload_r) = bounded::<Vec<u8>>(1);
        let (result_s, _result_r) = bounded(1);
        let (phy_s, phy_r) = bounded::<Vec<u8>>(1);
        let (_ack_s, ack_r) = bounded::<u16>(1);
        let config = test_config();
        let max_tries = config.max_tries;

        let mut sender = LinkSender::new(
            payload_r,
            result_s,
            phy_s,
            ack_r,
            config,
            Arc::new(AtomicBool::new(false)),
        );

        let handle = thread::spawn(move || {
            let frame = DataFrame::new(0, b"never acked").unwrap();
            sender.send_frame(&frame)
        });

        // drain everything the sender puts on the air; no acks ever come back
        let mut transmissions = 0u32;
        while let Ok(_frame) = phy_r.recv_timeout(Duration::from_millis(500)) {
            transmissions += 1;
        }

        let result = handle.join().unwrap();
        assert!(matches!(result, Err(LinkError::NoConnection)));
        assert_eq!(transmissions, max_tries);
    }

    #[test]
    fn test_sequence_advances_only_on_ack() {
        let (_payload_s, payload_r) = bounded::<Vec<u8>>(1);
        let (result_s, _result_r) = bounded(1);
        let (phy_s, phy_r) = bounded::<Vec<u8>>(1);
        let (ack_s, ack_r) = bounded::<u16>(1);

        let mut sender = LinkSender::new(
            payload_r,
            result_s,
            phy_s,
            ack_r,
            test_config(),
            Arc::new(AtomicBool::new(false)),
        );

        // two chunks -> two frames, acked as they appear
        let data = vec![0xABu8; PAYLOAD_SIZE + 10];
        let handle = thread::spawn(move || {
            let result = sender.send_data(&data);
            (result, sender.seq)
        });

        let mut seen = Vec::new();
        for _ in 0..2 {
            let raw = phy_r.recv_timeout(Duration::from_secs(2)).unwrap();
            let frame = DataFrame::from_bytes(&raw).unwrap();
            seen.push(frame.seq);
            ack_s.send(frame.seq).unwrap();
        }

        let (result, final_seq) = handle.join().unwrap();
        assert!(result.is_ok());
        assert_eq!(seen, vec![0, 1]);
        assert_eq!(final_seq, 2);
    }

    #[test]
    fn test_mismatched_ack_forces_retransmit() {
        let (_payload_s, payload_r) = bounded::<Vec<u8>>(1);
        let (result_s, _result_r) = bounded(1);
        let (phy_s, phy_r) = bounded::<Vec<u8>>(1);
        let (ack_s, ack_r) = bounded::<u16>(1);

        let mut sender = LinkSender::new(
            payload_r,
            result_s,
            phy_s,
            ack_r,
            test_config(),
            Arc::new(AtomicBool::new(false)),
        );

        let handle = thread::spawn(move || {
            let frame = DataFrame::new(5, b"hello").unwrap();
            sender.send_frame(&frame)
        });

        // wrong ack first: the frame must reappear
        let _first = phy_r.recv_timeout(Duration::from_secs(2)).unwrap();
        ack_s.send(99).unwrap();
        let second = phy_r.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(DataFrame::from_bytes(&second).unwrap().seq, 5);
        ack_s.send(5).unwrap();

        assert!(handle.join().unwrap().is_ok());
    }
}
