//! Low-level DSP primitives shared by voices, processors and busses.
//!
//! Everything in here works on fixed `BLOCK_SIZE` buffers, is allocation-free
//! once constructed, and is safe to embed directly inside voice structs.

/// Multiply buffers by envelopes and scalars.
pub mod amplify;
/// AHDSR envelope with shaped segments.
pub mod envelope;
/// Four-lane state-variable filter core with internal oversampling.
pub mod filter;
/// Polyphase IIR half-band decimator.
pub mod halfband;
/// Per-block linear interpolation of control values.
pub mod lipol;
/// Block summing, copying and clearing.
pub mod mix;
/// Mono and stereo pan laws.
pub mod pan;
/// Block-rate smoothing for incoming controller values.
pub mod smoother;
/// Interpolation and tuning tables built once at engine start.
pub mod tables;

pub use envelope::{AdsrStorage, Envelope, EnvelopeStage};
pub use halfband::HalfRateDecimator;
pub use lipol::BlockInterpolator;
pub use smoother::BlockSmoother;
pub use tables::Tables;
