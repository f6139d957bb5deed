//! Agent persona definitions.
//!
//! Each agent role is described by one JSON document loaded at startup. The
//! set is immutable for the lifetime of the process; sessions borrow the
//! persona for their selected role and never mutate it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Handoff delay bounds, in milliseconds. The delay gives the model time to
/// finish speaking its transfer phrase before the client reconnects.
pub const HANDOFF_DELAY_MIN_MS: u64 = 800;
pub const HANDOFF_DELAY_MAX_MS: u64 = 2500;

const DEFAULT_HANDOFF_DELAY_MS: u64 = 1500;

/// A configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("failed to read persona file {0}")]
    Io(String, #[source] std::io::Error),
    #[error("persona file {0} is not valid JSON")]
    Parse(String, #[source] serde_json::Error),
    #[error("persona {role}: {reason}")]
    Invalid { role: AgentRole, reason: String },
    #[error("persona directory {0} is missing a definition for role {1}")]
    MissingRole(String, AgentRole),
}

/// The two agent roles the gateway serves.
///
/// Role A answers general questions for anonymous callers; role B manages
/// account operations for authenticated callers. The letters are the wire
/// representation used in `agent.handoff` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    A,
    B,
}

impl AgentRole {
    /// The role a handoff from this role targets.
    pub fn other(self) -> Self {
        match self {
            AgentRole::A => AgentRole::B,
            AgentRole::B => AgentRole::A,
        }
    }

    /// Short human-readable description, used in logs.
    pub fn describe(self) -> &'static str {
        match self {
            AgentRole::A => "general assistant",
            AgentRole::B => "account concierge",
        }
    }

    /// Persona file stem for this role inside the persona directory.
    pub fn file_stem(self) -> &'static str {
        match self {
            AgentRole::A => "agent_a",
            AgentRole::B => "agent_b",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::A => write!(f, "A"),
            AgentRole::B => write!(f, "B"),
        }
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(AgentRole::A),
            "B" | "b" => Ok(AgentRole::B),
            other => Err(format!("unknown agent role '{other}'")),
        }
    }
}

/// Server-side voice-activity-detection parameters forwarded to the upstream
/// realtime session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadParams {
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
    /// Whether the upstream peer should generate a response automatically
    /// when the caller stops speaking.
    #[serde(default = "default_true")]
    pub auto_respond: bool,
}

fn default_true() -> bool {
    true
}

/// One named argument in a tool schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Schema for a single tool exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, ArgSpec>,
}

impl ToolSchema {
    /// Renders the schema in the shape the upstream realtime peer expects
    /// inside `session.update`.
    pub fn to_realtime_tool(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for (name, arg) in &self.arguments {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), serde_json::Value::String(arg.kind.clone()));
            if let Some(desc) = &arg.description {
                prop.insert("description".into(), serde_json::Value::String(desc.clone()));
            }
            properties.insert(name.clone(), serde_json::Value::Object(prop));
            if arg.required {
                required.push(serde_json::Value::String(name.clone()));
            }
        }
        serde_json::json!({
            "type": "function",
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

/// An immutable agent persona, loaded once at boot.
#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    pub role: AgentRole,
    pub voice: String,
    /// Seed utterance injected at session start so the agent greets first.
    pub intro_utterance: String,
    pub instructions: String,
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
    pub vad: VadParams,
    #[serde(default = "default_handoff_delay")]
    pub handoff_delay_ms: u64,
}

fn default_handoff_delay() -> u64 {
    DEFAULT_HANDOFF_DELAY_MS
}

impl Persona {
    fn validate(&self) -> Result<(), PersonaError> {
        let fail = |reason: String| PersonaError::Invalid {
            role: self.role,
            reason,
        };
        if self.voice.trim().is_empty() {
            return Err(fail("voice must not be empty".into()));
        }
        if self.instructions.trim().is_empty() {
            return Err(fail("instructions must not be empty".into()));
        }
        if self.intro_utterance.trim().is_empty() {
            return Err(fail("intro_utterance must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.vad.threshold) {
            return Err(fail(format!(
                "vad.threshold {} is outside [0.0, 1.0]",
                self.vad.threshold
            )));
        }
        if !(HANDOFF_DELAY_MIN_MS..=HANDOFF_DELAY_MAX_MS).contains(&self.handoff_delay_ms) {
            return Err(fail(format!(
                "handoff_delay_ms {} is outside [{HANDOFF_DELAY_MIN_MS}, {HANDOFF_DELAY_MAX_MS}]",
                self.handoff_delay_ms
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(fail("tool with empty name".into()));
            }
            if !seen.insert(tool.name.as_str()) {
                return Err(fail(format!("duplicate tool '{}'", tool.name)));
            }
        }
        Ok(())
    }
}

/// The full set of personas, one per role.
#[derive(Debug, Clone)]
pub struct PersonaSet {
    personas: HashMap<AgentRole, Persona>,
}

impl PersonaSet {
    /// Loads and validates `agent_a.json` and `agent_b.json` from `dir`.
    /// Any missing file or invalid definition fails fast.
    pub fn load(dir: &Path) -> Result<Self, PersonaError> {
        let mut personas = HashMap::new();
        for role in [AgentRole::A, AgentRole::B] {
            let path = dir.join(format!("{}.json", role.file_stem()));
            let display = path.display().to_string();
            if !path.exists() {
                return Err(PersonaError::MissingRole(dir.display().to_string(), role));
            }
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| PersonaError::Io(display.clone(), e))?;
            let persona: Persona =
                serde_json::from_str(&raw).map_err(|e| PersonaError::Parse(display, e))?;
            if persona.role != role {
                return Err(PersonaError::Invalid {
                    role,
                    reason: format!("file declares role {}", persona.role),
                });
            }
            persona.validate()?;
            personas.insert(role, persona);
        }
        Ok(Self { personas })
    }

    /// Builds a set from already-constructed personas. Used by tests.
    pub fn from_personas(a: Persona, b: Persona) -> Result<Self, PersonaError> {
        a.validate()?;
        b.validate()?;
        let mut personas = HashMap::new();
        personas.insert(AgentRole::A, a);
        personas.insert(AgentRole::B, b);
        Ok(Self { personas })
    }

    pub fn get(&self, role: AgentRole) -> &Persona {
        // Both roles are guaranteed present by construction.
        &self.personas[&role]
    }
}
