use crate::error::Result;
use crate::mcp::{
    PromptDefinition, ResourceDefinition, ToolCallRequest, ToolCallResponse, ToolDefinition,
};
use async_trait::async_trait;
use rmcp::model::{GetPromptResult, ReadResourceResult};
use serde_json::{Map, Value};

/// Which capability types a backend declared during the MCP handshake.
/// Presence only; the actual items are fetched lazily by the bundle builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclaredSupport {
    pub tools: bool,
    pub prompts: bool,
    pub resources: bool,
}

impl DeclaredSupport {
    pub fn none() -> Self {
        Self::default()
    }
}

/// A connected downstream MCP server. The aggregation core only ever talks to
/// backends through this trait: listing happens during bundle builds,
/// invocation happens during dispatch, and nothing here manages connections.
///
/// Production backends are [`crate::mcp::BackendClient`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait BackendHandle: Send + Sync {
    /// Backend name as declared in the configuration.
    fn name(&self) -> &str;

    /// Capability types this backend declared at handshake time.
    async fn declared_support(&self) -> DeclaredSupport;

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    async fn list_prompts(&self) -> Result<Vec<PromptDefinition>>;

    async fn list_resources(&self) -> Result<Vec<ResourceDefinition>>;

    /// Forward a tool call as-is and return the backend's response. Failures
    /// propagate; the caller decides whether to soften them.
    async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse>;

    /// Forward a prompt fetch as-is. Unlike tools, an error here is hard.
    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<GetPromptResult>;

    /// Forward a resource read as-is. Unlike tools, an error here is hard.
    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult>;
}
