// Session wiring: owns the four long-running workers (link-tx, link-rx,
// phy-tx, phy-rx) and the single-slot handoff buffers between them.
//
// Slot discipline: every inter-worker channel is bounded(1). The receive
// path uses try_send (drop on full) because samples keep arriving in real
// time; the transmit path uses bounded blocking sends because it is driven
// by application demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use tracing::{debug, info};

use crate::dsp::prbs::keystream;
use crate::link::receiver::LinkReceiver;
use crate::link::sender::LinkSender;
use crate::link::LinkError;
use crate::phy::{PhyReceiver, PhyTransmitter};
use crate::radio::{RadioRx, RadioTx};
use crate::utils::consts::{ACK_TIMEOUT_MS, DATA_FRAME_SIZE, LINK_MAX_TRIES, SCRAMBLE_SEED};

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long the sender waits for an ack before retransmitting
    pub ack_timeout: Duration,
    /// Transmissions per frame before reporting no connection
    pub max_tries: u32,
    /// Whitening keystream seed; must match the peer's
    pub scramble_seed: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_millis(ACK_TIMEOUT_MS),
            max_tries: LINK_MAX_TRIES,
            scramble_seed: SCRAMBLE_SEED,
        }
    }
}

/// One point-to-point link endpoint. Created once per session; owns all
/// modem, PHY, and link state exclusively.
pub struct LinkSession {
    payloads: Option<Sender<Vec<u8>>>,
    results: Receiver<Result<(), LinkError>>,
    deliveries: Receiver<Vec<u8>>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl LinkSession {
    pub fn new<T, R>(radio_tx: T, radio_rx: R, config: LinkConfig) -> Self
    where
        T: RadioTx + 'static,
        R: RadioRx + 'static,
    {
        let ks = Arc::new(keystream(config.scramble_seed, DATA_FRAME_SIZE));
        let stop = Arc::new(AtomicBool::new(false));

        // single-slot handoff buffers
        let (payload_s, payload_r) = bounded::<Vec<u8>>(1);
        let (result_s, result_r) = bounded::<Result<(), LinkError>>(1);
        let (phy_tx_s, phy_tx_r) = bounded::<Vec<u8>>(1);
        let (phy_rx_s, phy_rx_r) = bounded::<Vec<u8>>(1);
        let (ack_s, ack_r) = bounded::<u16>(1);
        let (deliver_s, deliver_r) = bounded::<Vec<u8>>(1);

        let mut workers = Vec::with_capacity(4);

        let phy_transmitter =
            PhyTransmitter::new(radio_tx, phy_tx_r, Arc::clone(&ks), Arc::clone(&stop));
        workers.push(
            thread::Builder::new()
                .name("phy-tx".into())
                .spawn(move || phy_transmitter.run())
                .expect("spawn phy-tx"),
        );

        let phy_receiver =
            PhyReceiver::new(radio_rx, phy_rx_s, Arc::clone(&ks), Arc::clone(&stop));
        workers.push(
            thread::Builder::new()
                .name("phy-rx".into())
                .spawn(move || phy_receiver.run())
                .expect("spawn phy-rx"),
        );

        let link_sender = LinkSender::new(
            payload_r,
            result_s,
            phy_tx_s.clone(),
            ack_r,
            config.clone(),
            Arc::clone(&stop),
        );
        workers.push(
            thread::Builder::new()
                .name("link-tx".into())
                .spawn(move || link_sender.run())
                .expect("spawn link-tx"),
        );

        let link_receiver =
            LinkReceiver::new(phy_rx_r, deliver_s, ack_s, phy_tx_s, Arc::clone(&stop));
        workers.push(
            thread::Builder::new()
                .name("link-rx".into())
                .spawn(move || link_receiver.run())
                .expect("spawn link-rx"),
        );

        info!("link session up");
        Self {
            payloads: Some(payload_s),
            results: result_r,
            deliveries: deliver_r,
            stop,
            workers,
        }
    }

    /// Transfer `data` to the peer with guaranteed in-order delivery.
    /// Blocks until every chunk is acknowledged or the link gives up.
    pub fn send(&self, data: &[u8]) -> Result<(), LinkError> {
        let payloads = self.payloads.as_ref().ok_or(LinkError::Closed)?;
        payloads
            .send(data.to_vec())
            .map_err(|_| LinkError::Closed)?;
        self.results.recv().map_err(|_| LinkError::Closed)?
    }

    /// Wait up to `timeout` for one delivered payload.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Vec<u8>, LinkError> {
        self.deliveries.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => LinkError::Timeout,
            RecvTimeoutError::Disconnected => LinkError::Closed,
        })
    }

    /// Shut the session down and join all four workers. Transmit workers
    /// wake via channel disconnection; receive workers notice the stop flag
    /// within their bounded poll interval.
    pub fn close(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.payloads.take();
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                debug!("worker panicked during shutdown: {e:?}");
            }
        }
        info!("link session down");
    }
}

impl Drop for LinkSession {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.payloads.take();
    }
}
