use crate::backend::BackendHandle;
use crate::capabilities::{build_bundles, ClientBundle};
use crate::config::{ConfigStore, ModeConfig};
use crate::error::{ProxyError, Result};
use crate::formatting;
use crate::mcp::{
    PromptDefinition, ResourceDefinition, ToolCallRequest, ToolCallResponse, ToolDefinition,
};
use once_cell::sync::Lazy;
use rmcp::model::{GetPromptResult, ReadResourceResult};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Reserved meta-tool names. A backend tool with either name is silently
/// shadowed by the special case in `invoke`.
pub const LIST_MODES_TOOL: &str = "list_modes";
pub const CHANGE_MODE_TOOL: &str = "change_mode";

static META_TOOLS: Lazy<[ToolDefinition; 2]> = Lazy::new(|| {
    [
        ToolDefinition {
            name: LIST_MODES_TOOL.to_string(),
            description: Some(
                "Lists available MCP modes. Will always include default.".to_string(),
            ),
            input_schema: json!({ "type": "object" }),
        },
        ToolDefinition {
            name: CHANGE_MODE_TOOL.to_string(),
            description: Some(
                "Change to a new MCP mode with different tools. \
                 Get the available modes with list_modes."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "mode_name": {
                        "type": "string",
                        "description": "The name of the mode to change to."
                    }
                }
            }),
        },
    ]
});

/// The process-wide aggregation state: the connected backends, the full mode
/// table, and the bundles built under the active mode. Bundles live behind a
/// single `Arc` that is replaced wholesale on a mode switch, so any reader
/// observes either the entirely-old or entirely-new collection.
pub struct Router {
    backends: Vec<Arc<dyn BackendHandle>>,
    modes: ModeConfig,
    bundles: RwLock<Arc<Vec<ClientBundle>>>,
    store: Option<ConfigStore>,
}

impl Router {
    /// Build the initial bundles under `starting_mode` and return the ready
    /// router. An unknown starting mode is a configuration error; after
    /// startup, bad mode names only ever produce soft errors.
    pub async fn initialize(
        backends: Vec<Arc<dyn BackendHandle>>,
        modes: ModeConfig,
        starting_mode: &str,
        store: Option<ConfigStore>,
    ) -> Result<Self> {
        let mode = modes.get(starting_mode).ok_or_else(|| {
            ProxyError::config(format!("Starting mode '{}' is not declared", starting_mode))
        })?;

        info!("Building initial bundles under mode: {}", starting_mode);
        let bundles = build_bundles(&backends, mode).await;

        Ok(Self {
            backends,
            modes,
            bundles: RwLock::new(Arc::new(bundles)),
            store,
        })
    }

    pub fn modes(&self) -> &ModeConfig {
        &self.modes
    }

    pub(crate) fn backends(&self) -> &[Arc<dyn BackendHandle>] {
        &self.backends
    }

    pub(crate) fn store(&self) -> Option<&ConfigStore> {
        self.store.as_ref()
    }

    /// The currently live bundle collection. Callers keep their own `Arc`,
    /// so an in-flight request is unaffected by a concurrent mode switch.
    pub async fn current_bundles(&self) -> Arc<Vec<ClientBundle>> {
        self.bundles.read().await.clone()
    }

    /// The single mutation point: one reference swap, nothing item-by-item.
    pub(crate) async fn replace_bundles(&self, new_bundles: Vec<ClientBundle>) {
        let mut lock = self.bundles.write().await;
        *lock = Arc::new(new_bundles);
    }

    /// Every tool visible under the active mode, plus the two meta-tools.
    /// Pure read of the last-built bundles; no backend is queried.
    pub async fn list_capabilities(&self) -> Vec<ToolDefinition> {
        let bundles = self.current_bundles().await;

        let mut tools: Vec<ToolDefinition> = bundles
            .iter()
            .flat_map(|bundle| bundle.capabilities.tools.iter().cloned())
            .collect();
        tools.extend(META_TOOLS.iter().cloned());

        tools
    }

    pub async fn list_prompts(&self) -> Vec<PromptDefinition> {
        let bundles = self.current_bundles().await;
        bundles
            .iter()
            .flat_map(|bundle| bundle.capabilities.prompts.iter().cloned())
            .collect()
    }

    pub async fn list_resources(&self) -> Vec<ResourceDefinition> {
        let bundles = self.current_bundles().await;
        bundles
            .iter()
            .flat_map(|bundle| bundle.capabilities.resources.iter().cloned())
            .collect()
    }

    /// Dispatch one tool invocation. The meta-tools are handled here; any
    /// other name is matched against bundle ownership in order, first match
    /// wins. An unowned name is a soft failure: the caller still receives a
    /// well-formed success envelope.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolCallResponse> {
        match name {
            LIST_MODES_TOOL => Ok(self.handle_list_modes()),
            CHANGE_MODE_TOOL => Ok(super::switch::change_mode(self, &arguments).await),
            _ => self.dispatch_tool(name, arguments).await,
        }
    }

    fn handle_list_modes(&self) -> ToolCallResponse {
        ToolCallResponse::text(formatting::describe_modes(&self.modes))
    }

    async fn dispatch_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResponse> {
        let bundles = self.current_bundles().await;

        let owner = bundles
            .iter()
            .find(|bundle| bundle.capabilities.tools.iter().any(|tool| tool.name == name));

        let Some(bundle) = owner else {
            debug!("No bundle owns tool: {}", name);
            return Ok(ToolCallResponse::text(format!(
                "ERROR: Tool with the name {} couldn't be found.",
                name
            )));
        };

        debug!("Dispatching tool {} to backend {}", name, bundle.server_name);

        // Backend invocation failures propagate unmodified; the caller needs
        // to see the real cause.
        bundle
            .handle
            .call_tool(ToolCallRequest {
                name: name.to_string(),
                arguments,
            })
            .await
    }

    /// Fetch a prompt from whichever bundle owns it. Unknown prompts are a
    /// hard error, unlike unknown tools.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<GetPromptResult> {
        let bundles = self.current_bundles().await;

        let owner = bundles.iter().find(|bundle| {
            bundle
                .capabilities
                .prompts
                .iter()
                .any(|prompt| prompt.name == name)
        });

        let Some(bundle) = owner else {
            return Err(ProxyError::PromptNotFound(name.to_string()));
        };

        bundle.handle.get_prompt(name, arguments).await
    }

    /// Read a resource from whichever bundle owns its URI. Unknown resources
    /// are a hard error, unlike unknown tools.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        let bundles = self.current_bundles().await;

        let owner = bundles.iter().find(|bundle| {
            bundle
                .capabilities
                .resources
                .iter()
                .any(|resource| resource.uri == uri)
        });

        let Some(bundle) = owner else {
            return Err(ProxyError::ResourceNotFound(uri.to_string()));
        };

        bundle.handle.read_resource(uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DeclaredSupport;
    use async_trait::async_trait;
    use serde_json::json;

    struct StubBackend {
        name: String,
        tools: Vec<String>,
    }

    impl StubBackend {
        fn boxed(name: &str, tools: &[&str]) -> Arc<dyn BackendHandle> {
            Arc::new(Self {
                name: name.to_string(),
                tools: tools.iter().map(|t| t.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl BackendHandle for StubBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn declared_support(&self) -> DeclaredSupport {
            DeclaredSupport {
                tools: true,
                prompts: false,
                resources: false,
            }
        }

        async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
            Ok(self
                .tools
                .iter()
                .map(|t| ToolDefinition {
                    name: t.clone(),
                    description: None,
                    input_schema: json!({}),
                })
                .collect())
        }

        async fn list_prompts(&self) -> Result<Vec<PromptDefinition>> {
            Ok(vec![])
        }

        async fn list_resources(&self) -> Result<Vec<ResourceDefinition>> {
            Ok(vec![])
        }

        async fn call_tool(&self, request: ToolCallRequest) -> Result<ToolCallResponse> {
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
            Err(ProxyError::PromptNotFound(name.to_string()))
        }

        async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
            Err(ProxyError::ResourceNotFound(uri.to_string()))
        }
    }

    async fn test_router() -> Router {
        let backends = vec![
            StubBackend::boxed("first", &["shared", "only_first"]),
            StubBackend::boxed("second", &["shared", "only_second"]),
        ];
        let modes: ModeConfig = serde_json::from_value(json!({
            "default": { "first": true, "second": true }
        }))
        .unwrap();

        Router::initialize(backends, modes, "default", None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_capabilities_appends_meta_tools() {
        let router = test_router().await;
        let tools = router.list_capabilities().await;

        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            ["shared", "only_first", "shared", "only_second", "list_modes", "change_mode"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_first_match_wins() {
        let router = test_router().await;

        let response = router.invoke("shared", json!({})).await.unwrap();
        assert_eq!(response.text_content(), "first handled shared");

        let response = router.invoke("only_second", json!({})).await.unwrap();
        assert_eq!(response.text_content(), "second handled only_second");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_soft_error() {
        let router = test_router().await;

        let response = router.invoke("unknown_tool", json!({})).await.unwrap();
        assert_eq!(
            response.text_content(),
            "ERROR: Tool with the name unknown_tool couldn't be found."
        );
    }

    #[tokio::test]
    async fn test_unknown_prompt_is_hard_error() {
        let router = test_router().await;

        let result = router.get_prompt("missing", None).await;
        assert!(matches!(result, Err(ProxyError::PromptNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_starting_mode_is_config_error() {
        let backends = vec![StubBackend::boxed("first", &["t1"])];
        let modes: ModeConfig =
            serde_json::from_value(json!({ "default": { "first": true } })).unwrap();

        let result = Router::initialize(backends, modes, "missing", None).await;
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }
}
