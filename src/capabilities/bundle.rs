use crate::backend::BackendHandle;
use crate::capabilities::resolver::{is_included, Capability, CapabilityType};
use crate::config::Mode;
use crate::error::{ProxyError, Result};
use crate::mcp::{PromptDefinition, ResourceDefinition, ToolDefinition};
use std::sync::Arc;
use tracing::{debug, error};

/// One backend's capabilities after mode filtering, in the backend's own
/// listing order.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    pub tools: Vec<ToolDefinition>,
    pub prompts: Vec<PromptDefinition>,
    pub resources: Vec<ResourceDefinition>,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The unit the router dispatches against. Bundles are rebuilt wholesale on
/// every mode switch and never mutated in place.
#[derive(Clone)]
pub struct ClientBundle {
    pub server_name: String,
    pub handle: Arc<dyn BackendHandle>,
    pub capabilities: CapabilitySet,
}

/// Build one bundle per backend under the given mode. Discovery for all
/// backends is launched before any result is awaited, so a slow backend only
/// delays its own contribution. A backend that fails during discovery is
/// logged and contributes an empty set; the build itself never fails.
/// Result order matches the order of `backends`.
pub async fn build_bundles(
    backends: &[Arc<dyn BackendHandle>],
    mode: &Mode,
) -> Vec<ClientBundle> {
    let builds = backends
        .iter()
        .map(|handle| build_bundle(Arc::clone(handle), mode));

    futures::future::join_all(builds).await
}

async fn build_bundle(handle: Arc<dyn BackendHandle>, mode: &Mode) -> ClientBundle {
    let server_name = handle.name().to_string();

    let capabilities = match discover_capabilities(handle.as_ref(), &server_name, mode).await {
        Ok(set) => set,
        Err(e) => {
            error!("{}; backend will expose no capabilities", e);
            CapabilitySet::empty()
        }
    };

    ClientBundle {
        server_name,
        handle,
        capabilities,
    }
}

async fn discover_capabilities(
    handle: &dyn BackendHandle,
    server_name: &str,
    mode: &Mode,
) -> Result<CapabilitySet> {
    let support = handle.declared_support().await;

    // Undeclared types are not queried at all; their lists stay empty.
    let tools = if support.tools {
        let listed = handle
            .list_tools()
            .await
            .map_err(|e| ProxyError::discovery(server_name, e))?;
        filter_capabilities(listed, server_name, CapabilityType::Tools, mode)
    } else {
        Vec::new()
    };

    let prompts = if support.prompts {
        let listed = handle
            .list_prompts()
            .await
            .map_err(|e| ProxyError::discovery(server_name, e))?;
        filter_capabilities(listed, server_name, CapabilityType::Prompts, mode)
    } else {
        Vec::new()
    };

    let resources = if support.resources {
        let listed = handle
            .list_resources()
            .await
            .map_err(|e| ProxyError::discovery(server_name, e))?;
        filter_capabilities(listed, server_name, CapabilityType::Resources, mode)
    } else {
        Vec::new()
    };

    debug!(
        "Backend {} exposes {} tools, {} prompts, {} resources under this mode",
        server_name,
        tools.len(),
        prompts.len(),
        resources.len()
    );

    Ok(CapabilitySet {
        tools,
        prompts,
        resources,
    })
}

fn filter_capabilities<C: Capability>(
    items: Vec<C>,
    server_name: &str,
    capability_type: CapabilityType,
    mode: &Mode,
) -> Vec<C> {
    items
        .into_iter()
        .filter(|item| is_included(item, server_name, capability_type, mode))
        .collect()
}
