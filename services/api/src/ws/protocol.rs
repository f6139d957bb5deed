//! Wire types for the relay.
//!
//! Inbound upstream events are parsed leniently: only the fields the gateway
//! acts on are modeled, everything else rides along untouched because the
//! relay forwards the original frame, never a re-serialization.

use serde::{Deserialize, Serialize};
use teller_core::persona::{AgentRole, Persona};

/// Event types the down-pump treats non-opaquely.
pub const EVT_SPEECH_STARTED: &str = "input_audio_buffer.speech_started";
pub const EVT_FUNCTION_CALL_DONE: &str = "response.function_call_arguments.done";
pub const EVT_ERROR: &str = "error";

/// Minimal view of an upstream textual event.
#[derive(Debug, Deserialize)]
pub struct UpstreamEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl UpstreamEvent {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// --- Gateway → upstream messages ---

#[derive(Serialize)]
struct SessionUpdate<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    session: SessionResource<'a>,
}

#[derive(Serialize)]
struct SessionResource<'a> {
    modalities: [&'static str; 2],
    voice: &'a str,
    instructions: &'a str,
    input_audio_format: &'static str,
    output_audio_format: &'static str,
    tools: Vec<serde_json::Value>,
    turn_detection: TurnDetection,
}

#[derive(Serialize)]
struct TurnDetection {
    #[serde(rename = "type")]
    kind: &'static str,
    threshold: f32,
    prefix_padding_ms: u32,
    silence_duration_ms: u32,
    create_response: bool,
}

/// The `session.update` payload configuring voice, instructions, tools,
/// audio formats, and server VAD for the selected persona.
pub fn session_update(persona: &Persona) -> String {
    let update = SessionUpdate {
        kind: "session.update",
        session: SessionResource {
            modalities: ["text", "audio"],
            voice: &persona.voice,
            instructions: &persona.instructions,
            input_audio_format: "pcm16",
            output_audio_format: "pcm16",
            tools: persona.tools.iter().map(|t| t.to_realtime_tool()).collect(),
            turn_detection: TurnDetection {
                kind: "server_vad",
                threshold: persona.vad.threshold,
                prefix_padding_ms: persona.vad.prefix_padding_ms,
                silence_duration_ms: persona.vad.silence_duration_ms,
                create_response: persona.vad.auto_respond,
            },
        },
    };
    serde_json::to_string(&update).expect("session.update serialization cannot fail")
}

/// Seeds the conversation with the persona's intro utterance so the agent
/// greets the caller first.
pub fn intro_item(persona: &Persona) -> String {
    serde_json::json!({
        "type": "conversation.item.create",
        "item": {
            "type": "message",
            "role": "user",
            "content": [
                { "type": "input_text", "text": persona.intro_utterance }
            ]
        }
    })
    .to_string()
}

/// Inserts a tool result into the upstream conversation.
pub fn function_call_output(call_id: &str, output: &str) -> String {
    serde_json::json!({
        "type": "conversation.item.create",
        "item": {
            "type": "function_call_output",
            "call_id": call_id,
            "output": output,
        }
    })
    .to_string()
}

/// Asks the upstream peer to generate the next response.
pub fn response_create() -> String {
    serde_json::json!({ "type": "response.create" }).to_string()
}

// --- Gateway → browser messages ---

/// The one custom event the gateway adds to the browser stream.
pub fn agent_handoff(target: AgentRole, message: &str) -> String {
    serde_json::json!({
        "type": "agent.handoff",
        "target_agent": target,
        "message": message,
    })
    .to_string()
}

/// Fatal session error reported to the browser before closing.
pub fn session_error(message: &str) -> String {
    serde_json::json!({
        "type": "error",
        "error": { "message": message },
    })
    .to_string()
}
