use super::types::{
    PromptDefinition, ResourceDefinition, ToolCallRequest, ToolCallResponse, ToolContent,
    ToolDefinition,
};
use crate::backend::{BackendHandle, DeclaredSupport};
use crate::error::{ProxyError, Result};
use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParams, GetPromptRequestParams, GetPromptResult, PaginatedRequestParams,
    RawContent, ReadResourceRequestParams, ReadResourceResult,
};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::ServiceExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default timeout for MCP handshake initialization.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// A wrapper around an rmcp RunningService for one backend MCP server
#[derive(Clone)]
pub struct BackendClient {
    server_name: String,
    service: Arc<RwLock<Option<Arc<RunningService<RoleClient, ()>>>>>,
    support: Arc<RwLock<DeclaredSupport>>,
}

impl BackendClient {
    pub fn new(server_name: String) -> Self {
        Self {
            server_name,
            service: Arc::new(RwLock::new(None)),
            support: Arc::new(RwLock::new(DeclaredSupport::none())),
        }
    }

    async fn store_service(&self, service: RunningService<RoleClient, ()>) {
        // Capability declarations arrive with the handshake and never change
        // for the lifetime of the connection, so capture them once here.
        let support = service
            .peer_info()
            .map(|info| DeclaredSupport {
                tools: info.capabilities.tools.is_some(),
                prompts: info.capabilities.prompts.is_some(),
                resources: info.capabilities.resources.is_some(),
            })
            .unwrap_or_default();

        *self.support.write().await = support;
        let mut lock = self.service.write().await;
        *lock = Some(Arc::new(service));
    }

    /// Initialize the client over a child-process stdio transport
    pub async fn init_with_transport(&self, transport: TokioChildProcess) -> Result<()> {
        info!("Initializing MCP client for backend: {}", self.server_name);

        let ct = CancellationToken::new();
        let ct_clone = ct.clone();

        let service = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            ().serve_with_ct(transport, ct_clone).await
        })
        .await
        .map_err(|_| {
            ct.cancel();
            ProxyError::McpProtocol(format!(
                "MCP handshake timed out after {:?} for backend: {}",
                HANDSHAKE_TIMEOUT, self.server_name
            ))
        })?
        .map_err(|e| {
            ProxyError::McpProtocol(format!("Failed to initialize MCP client: {:?}", e))
        })?;

        self.store_service(service).await;

        debug!("MCP client initialized for backend: {}", self.server_name);
        Ok(())
    }

    /// Initialize the client with a streamable-HTTP transport for remote backends
    pub async fn init_with_http(&self, url: &str) -> Result<()> {
        info!(
            "Initializing MCP HTTP client for backend: {} at {}",
            self.server_name, url
        );

        let transport = StreamableHttpClientTransport::from_uri(url);

        let ct = CancellationToken::new();
        let ct_clone = ct.clone();

        let service = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            ().serve_with_ct(transport, ct_clone).await
        })
        .await
        .map_err(|_| {
            ct.cancel();
            ProxyError::McpProtocol(format!(
                "MCP handshake timed out after {:?} for backend: {} at {}",
                HANDSHAKE_TIMEOUT, self.server_name, url
            ))
        })?
        .map_err(|e| {
            ProxyError::McpProtocol(format!("Failed to initialize MCP HTTP client: {:?}", e))
        })?;

        self.store_service(service).await;

        debug!(
            "MCP HTTP client initialized for backend: {}",
            self.server_name
        );
        Ok(())
    }

    async fn service(&self) -> Result<Arc<RunningService<RoleClient, ()>>> {
        let service_lock = self.service.read().await;
        service_lock
            .as_ref()
            .cloned()
            .ok_or_else(|| ProxyError::BackendNotConnected(self.server_name.clone()))
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

#[async_trait]
impl BackendHandle for BackendClient {
    fn name(&self) -> &str {
        &self.server_name
    }

    async fn declared_support(&self) -> DeclaredSupport {
        *self.support.read().await
    }

    /// List available tools, following pagination cursors to the end
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let service = self.service().await?;

        debug!("Listing tools for backend: {}", self.server_name);

        let mut tool_list = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = Some(PaginatedRequestParams {
                meta: None,
                cursor: cursor.clone(),
            });

            match service.list_tools(request).await {
                Ok(result) => {
                    tool_list.extend(result.tools.into_iter().map(|t| ToolDefinition {
                        name: t.name.to_string(),
                        description: t.description.map(|d| d.to_string()),
                        input_schema: Value::Object((*t.input_schema).clone()),
                    }));

                    cursor = result.next_cursor;
                    if cursor.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to list tools for {}: {}", self.server_name, e);
                    return Err(ProxyError::McpProtocol(format!(
                        "Failed to list tools: {}",
                        e
                    )));
                }
            }
        }

        debug!(
            "Found {} tools for backend: {}",
            tool_list.len(),
            self.server_name
        );
        Ok(tool_list)
    }

    async fn list_prompts(&self) -> Result<Vec<PromptDefinition>> {
        let service = self.service().await?;

        debug!("Listing prompts for backend: {}", self.server_name);

        let mut prompt_list = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = Some(PaginatedRequestParams {
                meta: None,
                cursor: cursor.clone(),
            });

            match service.list_prompts(request).await {
                Ok(result) => {
                    prompt_list.extend(result.prompts.into_iter().map(|p| PromptDefinition {
                        name: p.name.to_string(),
                        description: p.description.map(|d| d.to_string()),
                        arguments: p.arguments.and_then(|a| serde_json::to_value(a).ok()),
                    }));

                    cursor = result.next_cursor;
                    if cursor.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to list prompts for {}: {}", self.server_name, e);
                    return Err(ProxyError::McpProtocol(format!(
                        "Failed to list prompts: {}",
                        e
                    )));
                }
            }
        }

        Ok(prompt_list)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDefinition>> {
        let service = self.service().await?;

        debug!("Listing resources for backend: {}", self.server_name);

        let mut resource_list = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = Some(PaginatedRequestParams {
                meta: None,
                cursor: cursor.clone(),
            });

            match service.list_resources(request).await {
                Ok(result) => {
                    resource_list.extend(result.resources.into_iter().map(|r| {
                        let raw = r.raw;
                        ResourceDefinition {
                            uri: raw.uri,
                            name: if raw.name.is_empty() {
                                None
                            } else {
                                Some(raw.name)
                            },
                            description: raw.description,
                            mime_type: raw.mime_type,
                        }
                    }));

                    cursor = result.next_cursor;
                    if cursor.is_none() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to list resources for {}: {}", self.server_name, e);
                    return Err(ProxyError::McpProtocol(format!(
                        "Failed to list resources: {}",
                        e
                    )));
                }
            }
        }

        Ok(resource_list)
    }

    /// Call a tool on the backend MCP server
    async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse> {
        let service = self.service().await?;

        debug!(
            "Calling tool '{}' on backend: {}",
            request.name, self.server_name
        );

        let mcp_request = CallToolRequestParams {
            meta: None,
            name: request.name.clone().into(),
            arguments: request.arguments.as_object().cloned(),
            task: None,
        };

        match service.call_tool(mcp_request).await {
            Ok(result) => {
                let response_content: Vec<ToolContent> = result
                    .content
                    .into_iter()
                    .filter_map(|c| match c.raw {
                        RawContent::Text(text_content) => Some(ToolContent::Text {
                            text: text_content.text,
                        }),
                        RawContent::Image(image_content) => Some(ToolContent::Image {
                            data: image_content.data,
                            mime_type: image_content.mime_type,
                        }),
                        RawContent::Resource(resource_content) => {
                            match resource_content.resource {
                                rmcp::model::ResourceContents::TextResourceContents {
                                    uri,
                                    mime_type,
                                    ..
                                } => Some(ToolContent::Resource { uri, mime_type }),
                                rmcp::model::ResourceContents::BlobResourceContents {
                                    uri,
                                    mime_type,
                                    ..
                                } => Some(ToolContent::Resource { uri, mime_type }),
                            }
                        }
                        _ => None,
                    })
                    .collect();

                Ok(ToolCallResponse {
                    content: response_content,
                    is_error: result.is_error,
                })
            }
            Err(e) => {
                error!(
                    "Failed to call tool '{}' on {}: {}",
                    request.name, self.server_name, e
                );
                Err(ProxyError::McpProtocol(format!(
                    "Failed to call tool: {}",
                    e
                )))
            }
        }
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<GetPromptResult> {
        let service = self.service().await?;

        debug!(
            "Fetching prompt '{}' from backend: {}",
            name, self.server_name
        );

        service
            .get_prompt(GetPromptRequestParams {
                meta: None,
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| {
                error!(
                    "Failed to get prompt '{}' on {}: {}",
                    name, self.server_name, e
                );
                ProxyError::McpProtocol(format!("Failed to get prompt: {}", e))
            })
    }

    async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        let service = self.service().await?;

        debug!(
            "Reading resource '{}' from backend: {}",
            uri, self.server_name
        );

        service
            .read_resource(ReadResourceRequestParams {
                meta: None,
                uri: uri.to_string(),
            })
            .await
            .map_err(|e| {
                error!(
                    "Failed to read resource '{}' on {}: {}",
                    uri, self.server_name, e
                );
                ProxyError::McpProtocol(format!("Failed to read resource: {}", e))
            })
    }
}
