use crate::config::{AllowLists, Mode, ServerTarget};
use crate::mcp::{PromptDefinition, ResourceDefinition, ToolDefinition};
use std::fmt;

/// The three kinds of capability a backend can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityType {
    Tools,
    Prompts,
    Resources,
}

impl CapabilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityType::Tools => "tools",
            CapabilityType::Prompts => "prompts",
            CapabilityType::Resources => "resources",
        }
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything a mode can filter. The filter key is the capability's name,
/// falling back to the URI for resources that have none.
pub trait Capability {
    fn filter_key(&self) -> &str;
}

impl Capability for ToolDefinition {
    fn filter_key(&self) -> &str {
        &self.name
    }
}

impl Capability for PromptDefinition {
    fn filter_key(&self) -> &str {
        &self.name
    }
}

impl Capability for ResourceDefinition {
    fn filter_key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uri)
    }
}

impl ServerTarget {
    /// The allow-list this target declares for one capability type, if any.
    pub fn allow_list(&self, capability_type: CapabilityType) -> Option<&[String]> {
        match self {
            ServerTarget::Full(_) => None,
            ServerTarget::Allow(lists) => lists.allow_list(capability_type),
        }
    }
}

impl AllowLists {
    pub fn allow_list(&self, capability_type: CapabilityType) -> Option<&[String]> {
        let list = match capability_type {
            CapabilityType::Tools => &self.tools,
            CapabilityType::Prompts => &self.prompts,
            CapabilityType::Resources => &self.resources,
        };
        list.as_deref()
    }
}

/// The sole visibility authority. Every filtering decision in the proxy
/// routes through here; nothing else reimplements these rules.
///
/// A backend absent from the mode is excluded outright, as is a capability
/// type the target does not mention. Matches are exact and case-sensitive,
/// no wildcards.
pub fn is_included<C: Capability>(
    capability: &C,
    server_name: &str,
    capability_type: CapabilityType,
    mode: &Mode,
) -> bool {
    let Some(target) = mode.get(server_name) else {
        return false;
    };

    if target.is_full_access() {
        return true;
    }

    match target.allow_list(capability_type) {
        Some(allowed) => allowed.iter().any(|name| name == capability.filter_key()),
        None => false,
    }
}
