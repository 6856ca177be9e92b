//! rflink: a point-to-point data modem for SDR transceivers.
//!
//! Turns an arbitrary byte stream into a CPFSK burst waveform and recovers it
//! at the receiving end, with a stop-and-wait ARQ link layer providing
//! in-order, duplicate-free delivery over a lossy RF channel.
//!
//! The crate is layered bottom-up: [`dsp`] holds the signal-processing
//! primitives (modem, channel filter, power normalizer, preamble correlator,
//! CRC, whitening), [`phy`] drives the burst transmit/receive state machines,
//! [`link`] implements framing and the ARQ protocol, and [`radio`] is the
//! boundary trait the hardware layer plugs into.

pub mod dsp;
pub mod link;
pub mod phy;
pub mod radio;
pub mod utils;
