//! Agent handoff tools.
//!
//! A handoff tool returns immediately with a short transfer phrase for the
//! model to speak; the actual transition happens out-of-band when the relay
//! delivers an `agent.handoff` event to the browser after the persona's
//! configured delay.

use super::{optional_str, HandoffSignal, ToolError, ToolHandler, ToolOutput};
use crate::persona::AgentRole;
use crate::session::SessionContext;
use async_trait::async_trait;
use tracing::info;

pub struct HandoffTool {
    target: AgentRole,
}

impl HandoffTool {
    pub fn to_role(target: AgentRole) -> Self {
        Self { target }
    }

    fn transfer_phrase(&self) -> String {
        match self.target {
            AgentRole::A => "Let me connect you to our general assistant now...".to_string(),
            AgentRole::B => "Connecting you to your account concierge now...".to_string(),
        }
    }
}

#[async_trait]
impl ToolHandler for HandoffTool {
    fn name(&self) -> &'static str {
        match self.target {
            AgentRole::A => "handoff_to_a",
            AgentRole::B => "handoff_to_b",
        }
    }

    fn describe(&self) -> &'static str {
        match self.target {
            AgentRole::A => "transfers the caller to the general assistant",
            AgentRole::B => "transfers the caller to the account concierge",
        }
    }

    async fn execute(
        &self,
        session: &SessionContext,
        args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let reason = optional_str(args, "reason").unwrap_or("unspecified");
        info!(
            from = %session.role,
            to = %self.target,
            reason,
            "handoff requested"
        );
        Ok(ToolOutput::Handoff(HandoffSignal {
            target: self.target,
            message: self.transfer_phrase(),
        }))
    }
}
