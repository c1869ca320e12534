//! The mode-switch coordinator. Validation happens before anything touches
//! router state, so a rejected switch leaves the live bundles untouched; the
//! swap in the success path is the only write.

use super::router::Router;
use crate::capabilities::build_bundles;
use crate::mcp::ToolCallResponse;
use serde_json::Value;
use tracing::{info, warn};

/// Handle a `change_mode` invocation. Always returns a well-formed response
/// envelope: bad input and unknown modes are soft errors, exactly like an
/// unknown tool name.
pub(crate) async fn change_mode(router: &Router, arguments: &Value) -> ToolCallResponse {
    let Some(mode_name) = arguments.get("mode_name").and_then(Value::as_str) else {
        return ToolCallResponse::text(
            "Invalid input, please call change_mode with a valid string mode_name.",
        );
    };

    let Some(mode) = router.modes().get(mode_name) else {
        return ToolCallResponse::text(format!(
            "Mode {} not found, please call change_mode with an existing mode.",
            mode_name
        ));
    };

    info!("Switching to mode: {}", mode_name);

    let new_bundles = build_bundles(router.backends(), mode).await;
    router.replace_bundles(new_bundles).await;

    // The in-memory switch already happened; a persistence failure only
    // affects which mode the next process start comes up in.
    if let Some(store) = router.store() {
        if let Err(e) = store.set_starting_mode(mode_name) {
            warn!("Failed to persist starting mode {}: {}", mode_name, e);
        }
    }

    ToolCallResponse::text(format!(
        "Successfully changed to {} mode! Please re-check available tools.",
        mode_name
    ))
}
