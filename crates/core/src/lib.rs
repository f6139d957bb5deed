//! Teller Core Library
//!
//! Domain logic shared by the gateway service and the native voice client:
//!
//! - `persona`: agent persona definitions loaded from configuration at boot.
//! - `session`: the per-connection context (role, auth token, display name).
//! - `retrieval`: the knowledge-base retrieval service (chunking, embedding,
//!   nearest-neighbor search, keyword fallback).
//! - `backend`: the HTTP client for the account API.
//! - `tools`: the tool registry and the canonical tool handlers the gateway
//!   dispatches on behalf of the realtime model.

pub mod backend;
pub mod persona;
pub mod retrieval;
pub mod session;
pub mod tools;

pub use persona::{AgentRole, Persona, PersonaError, PersonaSet};
pub use session::SessionContext;
pub use tools::{HandoffSignal, ToolError, ToolOutput, ToolRegistry};
