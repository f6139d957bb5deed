//! Per-connection session context.
//!
//! A `SessionContext` is created when a browser channel is accepted and is
//! dropped when the channel closes. It carries everything tool handlers need
//! to act on behalf of the caller; no state survives the session.

use crate::persona::AgentRole;
use base64::Engine;
use uuid::Uuid;

/// Context for one connected caller.
///
/// The auth token is treated as an opaque string: the gateway never validates
/// a signature. The only parsing performed is a best-effort decode of the
/// middle JWT segment to recover a display name for logging; the backend
/// account API is the sole authority on whether the token is acceptable.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub role: AgentRole,
    pub auth_token: Option<String>,
    pub user_name: String,
}

impl SessionContext {
    /// Builds a context for a new connection. A present, non-empty token
    /// selects role B; anonymous callers get role A.
    pub fn new(auth_token: Option<String>) -> Self {
        let auth_token = auth_token.filter(|t| !t.trim().is_empty());
        let role = if auth_token.is_some() {
            AgentRole::B
        } else {
            AgentRole::A
        };
        let user_name = auth_token
            .as_deref()
            .and_then(display_name_from_token)
            .unwrap_or_else(|| "Guest".to_string());
        Self {
            session_id: Uuid::new_v4(),
            role,
            auth_token,
            user_name,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }
}

/// Extracts the `name` claim from a JWT-shaped token without verifying it.
/// Returns `None` for anything that does not decode cleanly.
pub fn display_name_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = decode_base64_segment(payload)?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn decode_base64_segment(segment: &str) -> Option<Vec<u8>> {
    // JWT payloads are url-safe base64 without padding, but hand-built mock
    // tokens sometimes use the standard alphabet; accept both.
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    if let Ok(bytes) = engine.decode(segment) {
        return Some(bytes);
    }
    let mut padded = segment.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    base64::engine::general_purpose::STANDARD.decode(padded).ok()
}
