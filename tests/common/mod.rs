use async_trait::async_trait;
use mcp_modes::backend::{BackendHandle, DeclaredSupport};
use mcp_modes::config::ModeConfig;
use mcp_modes::mcp::{
    PromptDefinition, ResourceDefinition, ToolCallRequest, ToolCallResponse, ToolDefinition,
};
use mcp_modes::{ProxyError, Result};
use rmcp::model::{GetPromptResult, ReadResourceResult};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory backend for driving the router without any real MCP servers.
/// Discovery calls are counted so tests can assert what was (not) queried.
pub struct FakeBackend {
    name: String,
    support: DeclaredSupport,
    tools: Vec<ToolDefinition>,
    prompts: Vec<PromptDefinition>,
    resources: Vec<ResourceDefinition>,
    fail_discovery: bool,
    fail_invocation: bool,
    pub discovery_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            support: DeclaredSupport::none(),
            tools: vec![],
            prompts: vec![],
            resources: vec![],
            fail_discovery: false,
            fail_invocation: false,
            discovery_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_tools(mut self, names: &[&str]) -> Self {
        self.support.tools = true;
        self.tools = names
            .iter()
            .map(|name| ToolDefinition {
                name: name.to_string(),
                description: Some(format!("Test tool {}", name)),
                input_schema: json!({ "type": "object" }),
            })
            .collect();
        self
    }

    pub fn with_prompts(mut self, names: &[&str]) -> Self {
        self.support.prompts = true;
        self.prompts = names
            .iter()
            .map(|name| PromptDefinition {
                name: name.to_string(),
                description: None,
                arguments: None,
            })
            .collect();
        self
    }

    pub fn with_resources(mut self, entries: &[(&str, Option<&str>)]) -> Self {
        self.support.resources = true;
        self.resources = entries
            .iter()
            .map(|(uri, name)| ResourceDefinition {
                uri: uri.to_string(),
                name: name.map(str::to_string),
                description: None,
                mime_type: None,
            })
            .collect();
        self
    }

    pub fn failing_discovery(mut self) -> Self {
        self.support.tools = true;
        self.fail_discovery = true;
        self
    }

    pub fn failing_invocation(mut self) -> Self {
        self.fail_invocation = true;
        self
    }

    pub fn discovery_count(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendHandle for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn declared_support(&self) -> DeclaredSupport {
        self.support
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery {
            return Err(ProxyError::McpProtocol(format!(
                "{}: connection dropped during discovery",
                self.name
            )));
        }
        Ok(self.tools.clone())
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDefinition>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prompts.clone())
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDefinition>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.resources.clone())
    }

    async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse> {
        if self.fail_invocation {
            return Err(ProxyError::McpProtocol(format!(
                "{}: tool {} blew up",
                self.name, request.name
            )));
        }
        Ok(ToolCallResponse::text(format!(
            "{} handled {}",
            self.name, request.name
        )))
    }

    async fn get_prompt(
        &self,
        name: &str,
        _arguments: Option<Map<String, Value>>,
    ) -> Result<GetPromptResult> {
        Err(ProxyError::McpProtocol(format!(
            "{}: prompt {} fetch not wired in this fake",
            self.name, name
        )))
    }

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        Err(ProxyError::McpProtocol(format!(
            "{}: resource {} read not wired in this fake",
            self.name, uri
        )))
    }
}

pub fn handles(backends: Vec<Arc<FakeBackend>>) -> Vec<Arc<dyn BackendHandle>> {
    backends
        .into_iter()
        .map(|b| b as Arc<dyn BackendHandle>)
        .collect()
}

pub fn modes(value: Value) -> ModeConfig {
    serde_json::from_value(value).expect("test mode config must deserialize")
}
