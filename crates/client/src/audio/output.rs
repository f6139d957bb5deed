//! Speaker output via cpal.
//!
//! The device callback is the single playback worker: it drains the shared
//! queue block by block, so barge-in takes effect on the very next block.

use super::pcm::WIRE_SAMPLE_RATE;
use super::playback::PlaybackQueue;
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Opens the default output device at the wire rate if possible and starts
/// draining the queue. The returned stream must be kept alive.
pub fn start_playback(queue: Arc<PlaybackQueue>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no output device available"))?;

    let config = preferred_config(&device)?;
    let channels = config.channels as usize;
    if config.sample_rate.0 != WIRE_SAMPLE_RATE {
        warn!(
            device_rate = config.sample_rate.0,
            "output device does not support 24 kHz; playback speed will be off"
        );
    }
    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        rate = config.sample_rate.0,
        channels,
        "starting playback"
    );

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _| {
            queue.fill_interleaved(data, channels);
        },
        |e| error!(error = %e, "playback stream error"),
        None,
    )?;
    stream.play().context("failed to start playback stream")?;
    Ok(stream)
}

/// Picks an f32 output configuration at the wire rate when the device offers
/// one, otherwise the device default.
fn preferred_config(device: &cpal::Device) -> Result<cpal::StreamConfig> {
    if let Ok(mut supported) = device.supported_output_configs() {
        if let Some(range) = supported.find(|range| {
            range.sample_format() == cpal::SampleFormat::F32
                && range.min_sample_rate().0 <= WIRE_SAMPLE_RATE
                && range.max_sample_rate().0 >= WIRE_SAMPLE_RATE
        }) {
            return Ok(range
                .with_sample_rate(cpal::SampleRate(WIRE_SAMPLE_RATE))
                .into());
        }
    }
    let default = device
        .default_output_config()
        .context("failed to query output configuration")?;
    Ok(default.into())
}
