// Hardware boundary. The core only needs two blocking primitives from the
// radio: transmit one fully-formed burst, and fill one fixed-size block of
// samples stamped with a monotonic sample-clock timestamp.

pub mod loopback;

use thiserror::Error;

use crate::dsp::Iq;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("radio transmit failed: {0}")]
    Transmit(String),
    #[error("radio receive failed: {0}")]
    Receive(String),
    #[error("radio device closed")]
    Closed,
}

/// Metadata returned with every received block.
#[derive(Debug, Clone, Copy)]
pub struct RxMeta {
    /// Sample-clock timestamp of the first sample in the block
    pub timestamp: u64,
    /// Set when the hardware dropped samples before this block; the block
    /// contents are then unusable for demodulation
    pub overrun: bool,
}

/// Transmit half of the radio. Blocks until the burst is fully sent.
pub trait RadioTx: Send {
    fn transmit_burst(&mut self, samples: &[Iq]) -> Result<(), RadioError>;
}

/// Receive half of the radio. Blocks (bounded) until `buf` is filled.
pub trait RadioRx: Send {
    fn receive_block(&mut self, buf: &mut [Iq]) -> Result<RxMeta, RadioError>;
}
