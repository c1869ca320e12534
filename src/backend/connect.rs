use crate::backend::BackendHandle;
use crate::config::BackendEntry;
use crate::error::{ProxyError, Result};
use crate::mcp::BackendClient;
use indexmap::IndexMap;
use rmcp::transport::TokioChildProcess;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

/// Connect to every configured backend, all handshakes in flight at once.
/// A backend that fails to connect is logged and skipped so a single bad
/// entry cannot take the whole proxy down. Declaration order is preserved
/// in the returned list.
pub async fn connect_backends(
    entries: &IndexMap<String, BackendEntry>,
) -> Vec<Arc<dyn BackendHandle>> {
    let attempts = entries
        .iter()
        .map(|(name, entry)| connect_backend(name.clone(), entry.clone()));

    let connected: Vec<Arc<dyn BackendHandle>> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .flatten()
        .collect();

    info!(
        "Connected {} of {} configured backends",
        connected.len(),
        entries.len()
    );

    connected
}

async fn connect_backend(name: String, entry: BackendEntry) -> Option<Arc<dyn BackendHandle>> {
    match try_connect(&name, &entry).await {
        Ok(client) => Some(Arc::new(client) as Arc<dyn BackendHandle>),
        Err(e) => {
            warn!("Failed to connect backend {}, skipping: {}", name, e);
            None
        }
    }
}

async fn try_connect(name: &str, entry: &BackendEntry) -> Result<BackendClient> {
    let client = BackendClient::new(name.to_string());

    match entry {
        BackendEntry::Stdio { command, args, env } => {
            let mut cmd = Command::new(command);
            cmd.args(args).envs(env);

            let transport = TokioChildProcess::new(cmd).map_err(|e| {
                ProxyError::McpProtocol(format!("Failed to spawn {}: {}", name, e))
            })?;

            client.init_with_transport(transport).await?;
        }
        BackendEntry::Remote { url } => {
            client.init_with_http(url).await?;
        }
    }

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_backends_are_skipped() {
        let mut entries = IndexMap::new();
        entries.insert(
            "broken".to_string(),
            BackendEntry::Stdio {
                command: "/nonexistent/mcp-server".to_string(),
                args: vec![],
                env: Default::default(),
            },
        );

        let backends = connect_backends(&entries).await;
        assert!(backends.is_empty());
    }
}
