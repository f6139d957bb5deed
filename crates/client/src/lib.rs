//! Teller Voice Client
//!
//! A native client for the gateway's realtime channel. The audio pipeline
//! mirrors the browser client's contract:
//!
//! - capture at the device's native rate, downmixed to mono;
//! - linear-interpolation resample to 24 kHz with the fractional position
//!   carried across buffers;
//! - PCM16 framing into ~200 ms `input_audio_buffer.append` events;
//! - a FIFO playback queue with short sine fades per chunk and barge-in that
//!   clears pending audio and flushes with a burst of silence.
//!
//! Device I/O lives behind the `hardware` feature; everything else is pure
//! and unit-tested.

pub mod audio;
pub mod client;

pub use client::{ClientOptions, GatewayEvent, PlaybackGate, SessionOutcome};
