//! The client audio pipeline.
//!
//! - `pcm`: PCM16/float conversion and base64 wire helpers.
//! - `resample`: streaming linear-interpolation resampler.
//! - `frame`: accumulation of resampled samples into wire frames.
//! - `playback`: FIFO playback queue with fades and barge-in.
//! - `capture` / `output` (feature `hardware`): cpal device streams.

pub mod frame;
pub mod pcm;
pub mod playback;
pub mod resample;

#[cfg(feature = "hardware")]
pub mod capture;
#[cfg(feature = "hardware")]
pub mod output;
