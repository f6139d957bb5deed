//! Gateway connection logic: event classification, the post-barge-in
//! playback gate, and (with the `hardware` feature) the full voice session
//! loop with reconnect-on-handoff.

use crate::audio::pcm;
use serde::Deserialize;
use teller_core::persona::AgentRole;

/// Options for a client run.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Gateway base URL, e.g. `ws://127.0.0.1:8003`.
    pub gateway_url: String,
    /// Bearer token presented when connecting as the authenticated role.
    pub jwt: Option<String>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The gateway asked us to reconnect as the given role.
    Handoff(AgentRole),
    /// The channel closed normally.
    Closed,
}

/// Events the client acts on, decoded from gateway text frames.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// A down-frame of PCM16 audio for the playback queue.
    AudioDelta(Vec<i16>),
    /// The caller started speaking; barge in now.
    SpeechStarted,
    /// A new model response began.
    ResponseStarted,
    /// Reconnect under the other persona.
    Handoff { target: AgentRole, message: String },
    TranscriptDelta(String),
    TranscriptDone(String),
    Error(String),
    /// Anything the client does not act on.
    Other,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    target_agent: Option<AgentRole>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Classifies a gateway text frame. Unknown or malformed frames become
/// `Other`; the client never dies on protocol noise.
pub fn classify_event(raw: &str) -> GatewayEvent {
    let Ok(event) = serde_json::from_str::<RawEvent>(raw) else {
        return GatewayEvent::Other;
    };
    match event.kind.as_str() {
        "response.audio.delta" => match event.delta {
            Some(payload) => GatewayEvent::AudioDelta(pcm::decode_pcm16(&payload)),
            None => GatewayEvent::Other,
        },
        "input_audio_buffer.speech_started" => GatewayEvent::SpeechStarted,
        "response.created" => GatewayEvent::ResponseStarted,
        "agent.handoff" => match event.target_agent {
            Some(target) => GatewayEvent::Handoff {
                target,
                message: event.message.unwrap_or_default(),
            },
            None => GatewayEvent::Other,
        },
        "response.audio_transcript.delta" => {
            GatewayEvent::TranscriptDelta(event.delta.unwrap_or_default())
        }
        "response.audio_transcript.done" => {
            GatewayEvent::TranscriptDone(event.transcript.unwrap_or_default())
        }
        "error" => GatewayEvent::Error(
            event
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        ),
        _ => GatewayEvent::Other,
    }
}

/// Drops audio deltas that belong to a response the user already interrupted.
/// Barge-in closes the gate; the next `response.created` reopens it.
#[derive(Debug, Default)]
pub struct PlaybackGate {
    dropping: bool,
}

impl PlaybackGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_barge_in(&mut self) {
        self.dropping = true;
    }

    pub fn on_response_started(&mut self) {
        self.dropping = false;
    }

    /// Whether an arriving audio delta should reach the playback queue.
    pub fn admits_audio(&self) -> bool {
        !self.dropping
    }
}

/// Builds the `input_audio_buffer.append` event for one up-frame. Empty
/// frames produce no event.
pub fn append_event(frame: &[i16]) -> Option<String> {
    if frame.is_empty() {
        return None;
    }
    Some(
        serde_json::json!({
            "type": "input_audio_buffer.append",
            "audio": pcm::encode_pcm16(frame),
        })
        .to_string(),
    )
}

/// Connection URL for a session, with the token as the `jwt` query parameter
/// when connecting as the authenticated role.
pub fn session_url(gateway_url: &str, jwt: Option<&str>) -> String {
    let base = gateway_url.trim_end_matches('/');
    match jwt {
        Some(token) if !token.is_empty() => format!("{base}/ws/chat?jwt={token}"),
        _ => format!("{base}/ws/chat"),
    }
}

/// A short local hold tone played while switching agents: two 440 Hz beeps
/// with a gap, at the wire sample rate.
pub fn hold_tone() -> Vec<f32> {
    let rate = pcm::WIRE_SAMPLE_RATE as f32;
    let beep_len = (rate * 0.15) as usize;
    let gap_len = (rate * 0.1) as usize;
    let mut tone = Vec::with_capacity(beep_len * 2 + gap_len);
    for repeat in 0..2 {
        if repeat > 0 {
            tone.extend(std::iter::repeat(0.0).take(gap_len));
        }
        for i in 0..beep_len {
            let t = i as f32 / rate;
            tone.push((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.2);
        }
    }
    tone
}

#[cfg(feature = "hardware")]
pub use hardware::run;

#[cfg(feature = "hardware")]
mod hardware {
    use super::*;
    use crate::audio::capture::start_capture;
    use crate::audio::frame::FrameAccumulator;
    use crate::audio::output::start_playback;
    use crate::audio::playback::PlaybackQueue;
    use crate::audio::resample::LinearResampler;
    use anyhow::{Context, Result};
    use futures_util::{SinkExt, StreamExt};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
    use tracing::{info, warn};

    /// Runs sessions until the channel closes for a reason other than a
    /// handoff, reconnecting with or without the token as directed.
    pub async fn run(opts: ClientOptions) -> Result<()> {
        let mut jwt = opts.jwt.clone();
        loop {
            let outcome = run_session(&opts.gateway_url, jwt.as_deref()).await?;
            match outcome {
                SessionOutcome::Handoff(AgentRole::B) => {
                    // Reconnect authenticated; the launch token is reused.
                    jwt = opts.jwt.clone();
                    if jwt.is_none() {
                        warn!("handoff to the account agent without a token; continuing as guest");
                    }
                    info!("reconnecting as the account concierge");
                }
                SessionOutcome::Handoff(AgentRole::A) => {
                    // Session token is cleared client-side for the anonymous role.
                    jwt = None;
                    info!("reconnecting as the general assistant");
                }
                SessionOutcome::Closed => {
                    info!("session closed");
                    return Ok(());
                }
            }
        }
    }

    async fn run_session(gateway_url: &str, jwt: Option<&str>) -> Result<SessionOutcome> {
        let url = session_url(gateway_url, jwt);
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .context("failed to connect to gateway")?;
        info!(authenticated = jwt.is_some(), "connected to gateway");
        let (mut ws_tx, mut ws_rx) = ws.split();

        let queue = Arc::new(PlaybackQueue::new());
        let _output_stream = start_playback(queue.clone())?;
        let mut capture = start_capture()?;
        let mut resampler = LinearResampler::new(capture.sample_rate, pcm::WIRE_SAMPLE_RATE);
        let mut frames = FrameAccumulator::default();
        let mut gate = PlaybackGate::new();

        loop {
            tokio::select! {
                block = capture.rx.recv() => {
                    let Some(block) = block else {
                        warn!("capture stream ended");
                        return Ok(SessionOutcome::Closed);
                    };
                    let resampled = resampler.process(&block);
                    let pcm16 = pcm::f32_to_pcm16(&resampled);
                    for frame in frames.push(&pcm16) {
                        if let Some(event) = append_event(&frame) {
                            ws_tx.send(WsMessage::text(event)).await
                                .context("failed to send audio frame")?;
                        }
                    }
                }
                incoming = ws_rx.next() => {
                    let Some(message) = incoming else {
                        return Ok(SessionOutcome::Closed);
                    };
                    let message = message.context("gateway stream errored")?;
                    match message {
                        WsMessage::Text(text) => match classify_event(&text) {
                            GatewayEvent::AudioDelta(samples) => {
                                if gate.admits_audio() {
                                    queue.enqueue(pcm::pcm16_to_f32(&samples));
                                }
                            }
                            GatewayEvent::SpeechStarted => {
                                info!("barge-in: clearing playback queue");
                                gate.on_barge_in();
                                queue.barge_in();
                            }
                            GatewayEvent::ResponseStarted => gate.on_response_started(),
                            GatewayEvent::Handoff { target, message } => {
                                info!(target = %target, %message, "agent handoff");
                                queue.barge_in();
                                queue.enqueue(hold_tone());
                                // Let the hold tone play before tearing down.
                                tokio::time::sleep(Duration::from_millis(600)).await;
                                let _ = ws_tx.close().await;
                                return Ok(SessionOutcome::Handoff(target));
                            }
                            GatewayEvent::TranscriptDelta(_) => {}
                            GatewayEvent::TranscriptDone(transcript) => {
                                if !transcript.is_empty() {
                                    println!("agent: {transcript}");
                                }
                            }
                            GatewayEvent::Error(details) => {
                                warn!(%details, "gateway reported an error");
                            }
                            GatewayEvent::Other => {}
                        },
                        WsMessage::Close(_) => return Ok(SessionOutcome::Closed),
                        _ => {}
                    }
                }
            }
        }
    }
}
