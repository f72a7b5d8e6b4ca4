//! Aggregated view of the tools exposed by connected sessions

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::session::SessionRegistry;
use crate::types::ToolDescriptor;

/// A tool annotated with the session that exposes it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTool {
    #[serde(flatten)]
    pub tool: ToolDescriptor,
    pub session_id: String,
    pub endpoint: String,
}

/// Read-only view over the session registry
///
/// Nothing is cached: every call reflects the registry at that moment, and
/// sessions that are not `Connected` are skipped.
#[derive(Clone)]
pub struct ToolCatalog {
    registry: Arc<SessionRegistry>,
}

impl ToolCatalog {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Every tool of every connected session, duplicates included, in
    /// session order
    pub fn aggregate(&self) -> Vec<AggregatedTool> {
        self.registry
            .connected()
            .into_iter()
            .flat_map(|session| {
                let session_id = session.id;
                let endpoint = session.endpoint;
                session.tools.into_iter().map(move |tool| AggregatedTool {
                    tool,
                    session_id: session_id.clone(),
                    endpoint: endpoint.clone(),
                })
            })
            .collect()
    }

    /// One entry per tool name; the earliest session wins
    pub fn deduplicated(&self) -> Vec<AggregatedTool> {
        let mut seen = HashSet::new();
        self.aggregate()
            .into_iter()
            .filter(|entry| seen.insert(entry.tool.name.clone()))
            .collect()
    }

    /// Tool set offered to the completion service
    pub fn llm_tools(&self) -> Vec<ToolDescriptor> {
        self.deduplicated().into_iter().map(|entry| entry.tool).collect()
    }

    /// Session that a call to `name` is routed to
    pub fn find_owner(&self, name: &str) -> Option<String> {
        self.registry
            .connected()
            .into_iter()
            .find(|session| session.tool(name).is_some())
            .map(|session| session.id)
    }

    pub fn available_names(&self) -> Vec<String> {
        self.deduplicated()
            .into_iter()
            .map(|entry| entry.tool.name)
            .collect()
    }
}
