use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;

/// Top-level configuration. Map order matters: backends are queried and
/// dispatched against in declaration order, which is why `IndexMap` is used
/// instead of `HashMap`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mcp_servers: IndexMap<String, BackendEntry>,
    pub modes: ModeConfig,
    /// Mode activated at startup; `"default"` when unset. Rewritten by a
    /// successful `change_mode` call.
    #[serde(default)]
    pub starting_mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// One configured backend MCP server. Untagged: a stdio entry carries
/// `command`, a remote entry carries `url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BackendEntry {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    Remote {
        url: String,
    },
}

/// What one mode exposes from one backend: either everything the backend
/// declares, or explicit per-type allow-lists. An absent type key excludes
/// that whole type, exactly like a present-but-empty list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerTarget {
    Full(bool),
    Allow(AllowLists),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AllowLists {
    pub tools: Option<Vec<String>>,
    pub prompts: Option<Vec<String>>,
    pub resources: Option<Vec<String>>,
}

impl ServerTarget {
    /// The `true` literal in the config. `false` is rejected at load time,
    /// so `Full(false)` never survives validation.
    pub fn is_full_access(&self) -> bool {
        matches!(self, ServerTarget::Full(true))
    }

    /// Whether this target can expose anything at all.
    pub fn exposes_anything(&self) -> bool {
        match self {
            ServerTarget::Full(full) => *full,
            ServerTarget::Allow(lists) => [&lists.prompts, &lists.resources, &lists.tools]
                .into_iter()
                .any(|list| list.as_ref().is_some_and(|names| !names.is_empty())),
        }
    }
}

/// A named visibility filter: backend name → what that backend exposes.
/// A backend absent from the map is fully excluded under that mode.
pub type Mode = IndexMap<String, ServerTarget>;

/// All declared modes. Must contain a `default` entry (validated at load).
pub type ModeConfig = IndexMap<String, Mode>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_target_full_access() {
        let target: ServerTarget = serde_json::from_value(json!(true)).unwrap();
        assert!(target.is_full_access());
        assert!(target.exposes_anything());
    }

    #[test]
    fn test_server_target_allow_lists() {
        let target: ServerTarget =
            serde_json::from_value(json!({ "tools": ["t1", "t2"] })).unwrap();
        assert!(!target.is_full_access());
        assert!(target.exposes_anything());

        match &target {
            ServerTarget::Allow(lists) => {
                assert_eq!(lists.tools.as_deref(), Some(&["t1".to_string(), "t2".to_string()][..]));
                assert!(lists.prompts.is_none());
                assert!(lists.resources.is_none());
            }
            ServerTarget::Full(_) => panic!("expected allow-lists"),
        }
    }

    #[test]
    fn test_server_target_empty_lists_expose_nothing() {
        let target: ServerTarget =
            serde_json::from_value(json!({ "tools": [], "prompts": [] })).unwrap();
        assert!(!target.exposes_anything());

        let target: ServerTarget = serde_json::from_value(json!({})).unwrap();
        assert!(!target.exposes_anything());
    }

    #[test]
    fn test_backend_entry_untagged() {
        let entry: BackendEntry =
            serde_json::from_value(json!({ "command": "npx", "args": ["-y", "some-mcp"] }))
                .unwrap();
        assert!(matches!(entry, BackendEntry::Stdio { .. }));

        let entry: BackendEntry =
            serde_json::from_value(json!({ "url": "https://example.com/mcp" })).unwrap();
        assert!(matches!(entry, BackendEntry::Remote { .. }));
    }

    #[test]
    fn test_mode_preserves_declaration_order() {
        let mode: Mode = serde_json::from_value(json!({
            "zeta": true,
            "alpha": { "tools": ["t1"] }
        }))
        .unwrap();

        let names: Vec<&String> = mode.keys().collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }
}
