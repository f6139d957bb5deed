//! Tool registry and executor.
//!
//! The upstream model requests tools by name; the registry maps each name to
//! a handler implementing validate/execute/describe. Handler failures are
//! rendered as `error:`-prefixed tool output so the model can recover
//! verbally on its next turn instead of the session dying.

pub mod account;
pub mod handoff;
pub mod knowledge;

use crate::persona::AgentRole;
use crate::session::SessionContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A per-call tool failure. The `Display` form is exactly what gets sent
/// upstream as the tool output.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("error: argument '{0}' required")]
    MissingArgument(&'static str),
    #[error("error: invalid arguments: {0}")]
    BadArguments(String),
    #[error("error: authentication required. Please log in through the app and reconnect, or ask me to transfer you.")]
    Unauthenticated,
    #[error("error: the request took too long. Please apologise and ask the customer to try again.")]
    BackendTimeout,
    #[error("error: the banking service is unavailable right now ({0}). Please apologise and suggest trying again shortly.")]
    Backend(String),
    #[error("error: unknown tool '{0}'")]
    UnknownTool(String),
}

/// Out-of-band signal that the caller should be moved to the other agent.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoffSignal {
    pub target: AgentRole,
    pub message: String,
}

/// What a successful tool call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text to insert into the conversation as the function result.
    Text(String),
    /// Text for the conversation plus a handoff signal for the relay to
    /// deliver to the browser after the configured delay.
    Handoff(HandoffSignal),
}

impl ToolOutput {
    /// The text that goes upstream as `function_call_output`.
    pub fn output_text(&self) -> &str {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Handoff(signal) => &signal.message,
        }
    }
}

/// One executable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line description used in logs and diagnostics.
    fn describe(&self) -> &'static str;

    /// Whether the session must carry an auth token to run this tool.
    fn requires_auth(&self) -> bool {
        false
    }

    /// Validates arguments without side effects.
    fn validate(&self, _args: &serde_json::Value) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(
        &self,
        session: &SessionContext,
        args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError>;
}

/// Maps tool names to handlers.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical handler set from the tool table: knowledge search, the
    /// account tools, and a handoff in each direction.
    pub fn standard(
        retrieval: Arc<crate::retrieval::RetrievalService>,
        account: Arc<crate::backend::AccountApi>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(knowledge::SearchKnowledgeBase::new(retrieval)));
        registry.register(Arc::new(account::GetAccountBalance::new(account.clone())));
        registry.register(Arc::new(account::GetAccountDetails::new(account.clone())));
        registry.register(Arc::new(account::GetRecentTransactions::new(account.clone())));
        registry.register(Arc::new(account::GetCardDetails::new(account.clone())));
        registry.register(Arc::new(account::FreezeCard::new(account.clone())));
        registry.register(Arc::new(account::UnfreezeCard::new(account)));
        registry.register(Arc::new(account::CheckProductOwnership));
        registry.register(Arc::new(handoff::HandoffTool::to_role(AgentRole::A)));
        registry.register(Arc::new(handoff::HandoffTool::to_role(AgentRole::B)));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Parses the raw argument JSON, enforces the auth policy, validates, and
    /// executes. The auth gate runs before the handler, so unauthenticated
    /// calls never reach the backend.
    pub async fn dispatch(
        &self,
        session: &SessionContext,
        tool_name: &str,
        arguments_json: &str,
    ) -> Result<ToolOutput, ToolError> {
        let handler = self
            .handlers
            .get(tool_name)
            .ok_or_else(|| ToolError::UnknownTool(tool_name.to_string()))?;

        if handler.requires_auth() && !session.is_authenticated() {
            warn!(tool = tool_name, "unauthenticated session requested gated tool");
            return Err(ToolError::Unauthenticated);
        }

        let args: serde_json::Value = if arguments_json.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(arguments_json)
                .map_err(|e| ToolError::BadArguments(e.to_string()))?
        };

        handler.validate(&args)?;
        info!(
            tool = tool_name,
            desc = handler.describe(),
            session = %session.session_id,
            "executing tool"
        );
        handler.execute(session, &args).await
    }

    /// Like `dispatch`, but folds errors into user-visible tool output text,
    /// which is what the relay sends upstream.
    pub async fn dispatch_to_text(
        &self,
        session: &SessionContext,
        tool_name: &str,
        arguments_json: &str,
    ) -> ToolOutput {
        match self.dispatch(session, tool_name, arguments_json).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = tool_name, error = %e, "tool call failed");
                ToolOutput::Text(e.to_string())
            }
        }
    }
}

/// Pulls a required non-empty string argument.
pub(crate) fn require_str<'a>(
    args: &'a serde_json::Value,
    key: &'static str,
) -> Result<&'a str, ToolError> {
    match args.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ToolError::MissingArgument(key)),
    }
}

/// Pulls an optional string argument.
pub(crate) fn optional_str<'a>(args: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}
