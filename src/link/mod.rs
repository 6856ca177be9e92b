pub mod frame;
pub mod receiver;
pub mod sender;
pub mod session;

pub use frame::{AckFrame, DataFrame, FrameError, FrameType};
pub use session::{LinkConfig, LinkSession};

use thiserror::Error;

use crate::radio::RadioError;

#[derive(Debug, Error)]
pub enum LinkError {
    /// ARQ exhausted its retry budget; the peer is unreachable
    #[error("no connection: retries exhausted")]
    NoConnection,
    /// No payload arrived within the requested wait
    #[error("timed out waiting for data")]
    Timeout,
    /// The session workers have shut down
    #[error("link session closed")]
    Closed,
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Radio(#[from] RadioError),
}
