//! Microphone capture via cpal.
//!
//! Captures at the device's native configuration, downmixes to mono, and
//! ships float blocks to the session loop over a channel. Resampling to the
//! wire rate happens in the session loop, not here.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{error, info};

/// A running capture stream. Dropping this stops the device.
pub struct Capture {
    _stream: cpal::Stream,
    pub rx: mpsc::UnboundedReceiver<Vec<f32>>,
    pub sample_rate: u32,
}

/// Averages interleaved channels into mono.
fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Opens the default input device and starts capturing.
pub fn start_capture() -> Result<Capture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;
    let config = device
        .default_input_config()
        .context("failed to query input configuration")?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    info!(
        device = %device.name().unwrap_or_else(|_| "unknown".into()),
        sample_rate,
        channels,
        "starting microphone capture"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let err_fn = |e| error!(error = %e, "capture stream error");

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config.into(),
            move |data: &[f32], _| {
                let _ = tx.send(downmix(data, channels));
            },
            err_fn,
            None,
        )?,
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config.into(),
            move |data: &[i16], _| {
                let floats: Vec<f32> = data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                let _ = tx.send(downmix(&floats, channels));
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("unsupported input sample format {other:?}")),
    };
    stream.play().context("failed to start capture stream")?;

    Ok(Capture {
        _stream: stream,
        rx,
        sample_rate,
    })
}
