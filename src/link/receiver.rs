// Receiving side of the link: validate, deduplicate, deliver, acknowledge.
//
// Every structurally valid data frame is acknowledged, duplicate or not —
// the sender may simply have missed the previous ack. Delivery to the
// application uses a single-slot buffer and drops when it is occupied; the
// sender-side retry budget bounds the resulting loss.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use crate::link::frame::{AckFrame, DataFrame, FrameType};
use crate::utils::consts::WORKER_POLL_MS;

pub struct LinkReceiver {
    /// Frames produced by the PHY receive worker
    frames: Receiver<Vec<u8>>,
    /// Payload handoff to the user-facing receive call
    deliveries: Sender<Vec<u8>>,
    /// Ack numbers handed to the link transmit worker
    acks: Sender<u16>,
    /// Handoff slot into the PHY transmit worker (for outgoing acks)
    phy_tx: Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
    /// Sequence number of the last payload delivered to the application
    last_delivered: Option<u16>,
}

impl LinkReceiver {
    pub fn new(
        frames: Receiver<Vec<u8>>,
        deliveries: Sender<Vec<u8>>,
        acks: Sender<u16>,
        phy_tx: Sender<Vec<u8>>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            frames,
            deliveries,
            acks,
            phy_tx,
            stop,
            last_delivered: None,
        }
    }

    pub fn run(mut self) {
        info!("link-rx worker up");
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            // bounded wait so the stop flag is noticed without a wake step
            let raw = match self
                .frames
                .recv_timeout(Duration::from_millis(WORKER_POLL_MS))
            {
                Ok(raw) => raw,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            self.handle_frame(&raw);
        }
        info!("link-rx worker down");
    }

    fn handle_frame(&mut self, raw: &[u8]) {
        let Some(&tag) = raw.first() else {
            return;
        };
        match FrameType::from_u8(tag) {
            Ok(FrameType::Data) => self.handle_data(raw),
            Ok(FrameType::Ack) => self.handle_ack(raw),
            Err(e) => debug!("frame dropped: {e}"),
        }
    }

    fn handle_data(&mut self, raw: &[u8]) {
        let frame = match DataFrame::from_bytes(raw) {
            Ok(frame) => frame,
            Err(e) => {
                // transient channel error: drop silently and keep scanning
                debug!("data frame dropped: {e}");
                return;
            }
        };

        if self.last_delivered == Some(frame.seq) {
            debug!(seq = frame.seq, "duplicate frame, not delivered");
        } else {
            match self.deliveries.try_send(frame.payload) {
                Ok(()) => {
                    self.last_delivered = Some(frame.seq);
                    trace!(seq = frame.seq, "payload delivered");
                }
                Err(TrySendError::Full(_)) => {
                    warn!(seq = frame.seq, "delivery slot occupied, payload dropped")
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }

        // acknowledge every structurally valid data frame, duplicates
        // included
        let ack = AckFrame::new(frame.seq).to_bytes();
        if self
            .phy_tx
            .send_timeout(ack, Duration::from_millis(WORKER_POLL_MS))
            .is_err()
        {
            warn!(seq = frame.seq, "could not hand ack to phy");
        }
    }

    fn handle_ack(&mut self, raw: &[u8]) {
        let ack = match AckFrame::from_bytes(raw) {
            Ok(ack) => ack,
            Err(e) => {
                debug!("ack frame dropped: {e}");
                return;
            }
        };
        trace!(ack = ack.ack_num, "ack received");
        // drop-on-full: the sender drains stale acks before every attempt,
        // so an occupied slot means it has not looked yet
        match self.acks.try_send(ack.ack_num) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    struct Harness {
        receiver: LinkReceiver,
        deliveries: Receiver<Vec<u8>>,
        acks: Receiver<u16>,
        phy: Receiver<Vec<u8>>,
    }

    fn harness() -> Harness {
        let (_frame_s, frame_r) = bounded(1);
        let (deliver_s, deliver_r) = bounded(1);
        let (ack_s, ack_r) = bounded(1);
        let (phy_s, phy_r) = bounded(4);
        Harness {
            receiver: LinkReceiver::new(
                frame_r,
                deliver_s,
                ack_s,
                phy_s,
                Arc::new(AtomicBool::new(false)),
            ),
            deliveries: deliver_r,
            acks: ack_r,
            phy: phy_r,
        }
    }

    #[test]
    fn test_valid_data_frame_delivered_and_acked() {
        let mut h = harness();
        let raw = DataFrame::new(3, b"abc").unwrap().to_bytes();
        h.receiver.handle_frame(&raw);

        assert_eq!(h.deliveries.try_recv().unwrap(), b"abc");
        let ack_raw = h.phy.try_recv().unwrap();
        assert_eq!(AckFrame::from_bytes(&ack_raw).unwrap().ack_num, 3);
    }

    #[test]
    fn test_duplicate_suppressed_but_acked_twice() {
        let mut h = harness();
        let raw = DataFrame::new(7, b"only once").unwrap().to_bytes();

        h.receiver.handle_frame(&raw);
        assert_eq!(h.deliveries.try_recv().unwrap(), b"only once");

        // identical sequence number again: no second delivery, but an ack
        h.receiver.handle_frame(&raw);
        assert!(h.deliveries.try_recv().is_err());

        let first = AckFrame::from_bytes(&h.phy.try_recv().unwrap()).unwrap();
        let second = AckFrame::from_bytes(&h.phy.try_recv().unwrap()).unwrap();
        assert_eq!(first.ack_num, 7);
        assert_eq!(second.ack_num, 7);
    }

    #[test]
    fn test_crc_failure_dropped_silently() {
        let mut h = harness();
        let mut raw = DataFrame::new(1, b"bits").unwrap().to_bytes();
        raw[200] ^= 0x01;
        h.receiver.handle_frame(&raw);

        assert!(h.deliveries.try_recv().is_err());
        assert!(h.phy.try_recv().is_err(), "corrupt frame must not be acked");
    }

    #[test]
    fn test_ack_frame_routed_to_sender() {
        let mut h = harness();
        let raw = AckFrame::new(42).to_bytes();
        h.receiver.handle_frame(&raw);
        assert_eq!(h.acks.try_recv().unwrap(), 42);
    }

    #[test]
    fn test_newest_ack_wins_when_slot_full() {
        let mut h = harness();
        h.receiver.handle_frame(&AckFrame::new(1).to_bytes());
        h.receiver.handle_frame(&AckFrame::new(2).to_bytes());
        // slot holds the first; the second was dropped rather than blocking
        assert_eq!(h.acks.try_recv().unwrap(), 1);
        assert!(h.acks.try_recv().is_err());
    }
}
