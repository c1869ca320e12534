// The caller-facing MCP server. Every request is answered from the router's
// aggregated state; this layer only translates between rmcp model types and
// the proxy's own.

use crate::error::ProxyError;
use crate::mcp::types::{PromptDefinition, ResourceDefinition, ToolContent, ToolDefinition};
use crate::routing::Router;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
    ListPromptsResult, ListResourcesResult, ListToolsResult, PaginatedRequestParams,
    ReadResourceRequestParams, ReadResourceResult, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct ProxyServer {
    router: Arc<Router>,
}

impl ProxyServer {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

impl ServerHandler for ProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Aggregates tools, prompts, and resources from multiple MCP servers. \
                 Use list_modes to see the available modes and change_mode to switch \
                 which capabilities are visible."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        debug!("Frontend listing aggregated tools");
        let tools = self.router.list_capabilities().await;

        Ok(ListToolsResult {
            meta: None,
            tools: tools.into_iter().map(to_rmcp_tool).collect(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        debug!("Frontend calling tool: {}", params.name);

        let arguments = serde_json::Value::Object(params.arguments.unwrap_or_default());

        let response = self
            .router
            .invoke(params.name.as_ref(), arguments)
            .await
            .map_err(|e| McpError::internal_error(format!("Failed to call tool: {}", e), None))?;

        let content: Vec<rmcp::model::Content> = response
            .content
            .into_iter()
            .map(|c| match c {
                ToolContent::Text { text } => rmcp::model::Content::text(text),
                ToolContent::Image { data, mime_type } => {
                    rmcp::model::Content::image(data, mime_type)
                }
                ToolContent::Resource { uri, mime_type } => rmcp::model::Content::text(format!(
                    "Resource: {} ({})",
                    uri,
                    mime_type.unwrap_or_else(|| "unknown".to_string())
                )),
            })
            .collect();

        Ok(CallToolResult {
            meta: None,
            content,
            structured_content: None,
            is_error: response.is_error,
        })
    }

    async fn list_prompts(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        debug!("Frontend listing aggregated prompts");
        let prompts = self.router.list_prompts().await;

        Ok(ListPromptsResult {
            meta: None,
            prompts: prompts.into_iter().map(to_rmcp_prompt).collect(),
            next_cursor: None,
        })
    }

    async fn get_prompt(
        &self,
        params: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        debug!("Frontend fetching prompt: {}", params.name);

        self.router
            .get_prompt(params.name.as_ref(), params.arguments)
            .await
            .map_err(to_mcp_error)
    }

    async fn list_resources(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        debug!("Frontend listing aggregated resources");
        let resources = self.router.list_resources().await;

        Ok(ListResourcesResult {
            meta: None,
            resources: resources.into_iter().map(to_rmcp_resource).collect(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        debug!("Frontend reading resource: {}", params.uri);

        self.router
            .read_resource(&params.uri)
            .await
            .map_err(to_mcp_error)
    }
}

fn to_mcp_error(err: ProxyError) -> McpError {
    match err {
        ProxyError::PromptNotFound(_) | ProxyError::ResourceNotFound(_) => {
            McpError::invalid_params(err.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

fn to_rmcp_tool(tool: ToolDefinition) -> rmcp::model::Tool {
    rmcp::model::Tool {
        name: tool.name.into(),
        title: None,
        description: tool.description.map(Into::into),
        input_schema: Arc::new(tool.input_schema.as_object().cloned().unwrap_or_default()),
        output_schema: None,
        annotations: None,
        icons: None,
        meta: None,
    }
}

fn to_rmcp_prompt(prompt: PromptDefinition) -> rmcp::model::Prompt {
    let arguments = prompt
        .arguments
        .and_then(|value| serde_json::from_value(value).ok());

    rmcp::model::Prompt {
        name: prompt.name.into(),
        title: None,
        description: prompt.description.map(Into::into),
        arguments,
        icons: None,
        meta: None,
    }
}

fn to_rmcp_resource(resource: ResourceDefinition) -> rmcp::model::Resource {
    rmcp::model::Resource {
        raw: rmcp::model::RawResource {
            uri: resource.uri,
            name: resource.name.unwrap_or_default(),
            title: None,
            description: resource.description,
            mime_type: resource.mime_type,
            size: None,
            icons: None,
            meta: None,
        },
        annotations: None,
    }
}
