//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! read-only resources: configuration, personas, the retrieval service, and
//! the tool registry. Sessions are isolated; nothing here is mutated after
//! startup.

use crate::config::Config;
use std::sync::Arc;
use teller_core::persona::PersonaSet;
use teller_core::retrieval::RetrievalService;
use teller_core::tools::ToolRegistry;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub personas: Arc<PersonaSet>,
    pub retrieval: Arc<RetrievalService>,
    pub tools: Arc<ToolRegistry>,
}
