pub mod receiver;
pub mod transmitter;

pub use receiver::PhyReceiver;
pub use transmitter::{PhyTransmitter, build_burst};
