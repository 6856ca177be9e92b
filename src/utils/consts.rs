/// Log level (overridable via RUST_LOG)
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Modulation Parameters
// ============================================================================

/// Samples per symbol (oversampling factor)
pub const SAMP_PER_SYMB: usize = 8;

/// Points on the precomputed unit-circle phase table
pub const PHASE_TABLE_SIZE: usize = 16;

/// Transmit amplitude in DAC counts (full scale is 2047)
pub const TX_AMPLITUDE: f64 = 2000.0;

/// Saturation bound after receive-side gain scaling
pub const IQ_SAT: i16 = 4095;

// ============================================================================
// Receive Chain
// ============================================================================

/// Samples per hardware receive block
pub const RX_BLOCK_SAMPLES: usize = 8192;

/// Power-normalizer target for average instantaneous power (|s|^2),
/// i.e. an amplitude of 1024 counts
pub const NOMINAL_POWER: f64 = 1024.0 * 1024.0;

/// IIR weight of the power estimate
pub const PNORM_ALPHA: f64 = 1.0 / 64.0;

pub const PNORM_MIN_GAIN: f64 = 0.05;
pub const PNORM_MAX_GAIN: f64 = 40.0;

/// Normalized samples whose power exceeds this multiple of nominal
/// are blanked to zero
pub const IMPULSE_BLANK_RATIO: f64 = 10.0;

/// Correlator input decimation factor
pub const CORR_DECIMATION: usize = 2;

/// Decimated samples to wait after a correlation peak before committing
pub const CORR_COUNTDOWN: u32 = 30;

// ============================================================================
// Burst Structure
// ============================================================================

/// Fixed pattern sent ahead of the preamble to settle receiver gain.
/// Any 4-byte pattern lands back at phase (1, 0): each bit moves the phase
/// index by ±SAMP_PER_SYMB steps, and 32 of those cancel mod PHASE_TABLE_SIZE.
pub const TRAINING_SEQ: [u8; 4] = [0xAA, 0xAA, 0xAA, 0xAA];

/// Fixed preamble pattern the correlator searches for
pub const PREAMBLE: [u8; 4] = [0x2E, 0x69, 0x2C, 0xF0];

// ============================================================================
// Link Layer
// ============================================================================

/// Data frame payload capacity (bytes)
pub const PAYLOAD_SIZE: usize = 1000;

/// [type:1][seq:2][payload_len:2][payload:1000][crc32:4]
pub const DATA_FRAME_SIZE: usize = 1 + 2 + 2 + PAYLOAD_SIZE + 4;

/// [type:1][ack_num:2][crc32:4]
pub const ACK_FRAME_SIZE: usize = 1 + 2 + 4;

/// Transmissions per frame before the link reports no connection
pub const LINK_MAX_TRIES: u32 = 5;

pub const ACK_TIMEOUT_MS: u64 = 500;

/// Bounded wait used by receive-side workers to notice the stop flag
pub const WORKER_POLL_MS: u64 = 500;

/// Whitening keystream seed; both endpoints must agree on it
pub const SCRAMBLE_SEED: u32 = 0x6C31_8F4A;
