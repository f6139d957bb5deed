//! Knowledge-base search tool.

use super::{require_str, ToolError, ToolHandler, ToolOutput};
use crate::retrieval::{RetrievalService, DEFAULT_RESULTS};
use crate::session::SessionContext;
use async_trait::async_trait;
use std::sync::Arc;

pub struct SearchKnowledgeBase {
    retrieval: Arc<RetrievalService>,
}

impl SearchKnowledgeBase {
    pub fn new(retrieval: Arc<RetrievalService>) -> Self {
        Self { retrieval }
    }
}

#[async_trait]
impl ToolHandler for SearchKnowledgeBase {
    fn name(&self) -> &'static str {
        "search_knowledge_base"
    }

    fn describe(&self) -> &'static str {
        "semantic search over the help-center corpus"
    }

    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        require_str(args, "query").map(|_| ())
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let query = require_str(args, "query")?;
        Ok(ToolOutput::Text(
            self.retrieval.search(query, DEFAULT_RESULTS).await,
        ))
    }
}
