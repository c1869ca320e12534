//! Human-readable summaries of what each mode exposes. This is the payload
//! of the `list_modes` meta-tool, so the output is written for an agent that
//! has to decide which mode to switch to.

use crate::capabilities::CapabilityType;
use crate::config::{Mode, ModeConfig, ServerTarget};

const NO_CAPABILITIES_MESSAGE: [&str; 3] = [
    "There are no available tools, prompts, or resources for this mode.",
    "This was likely in error, you should alert your user to this misconfigured configuration.",
    "Please direct your user to the mcp-modes README.",
];

/// Render the summary for every declared mode, separated by blank lines.
pub fn describe_modes(modes: &ModeConfig) -> String {
    modes
        .iter()
        .map(|(mode_name, mode)| describe_mode(mode_name, mode))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render one mode: a heading, then per backend either the full-access line
/// or a bulleted list per declared capability type, in the fixed order
/// prompts, resources, tools.
pub fn describe_mode(mode_name: &str, mode: &Mode) -> String {
    let mut lines = vec![format!("## For the {} mode:", mode_name)];

    if !mode_has_capabilities(mode) {
        lines.extend(NO_CAPABILITIES_MESSAGE.iter().map(|s| s.to_string()));
        return lines.join("\n");
    }

    for (server_name, target) in mode {
        lines.push(format!("### From the {} MCP server", server_name));

        if target.is_full_access() {
            lines.push("- All available tools, prompts, and resources.".to_string());
            continue;
        }

        summarize_capability_type(&mut lines, CapabilityType::Prompts, target);
        summarize_capability_type(&mut lines, CapabilityType::Resources, target);
        summarize_capability_type(&mut lines, CapabilityType::Tools, target);
    }

    lines.join("\n")
}

fn summarize_capability_type(
    lines: &mut Vec<String>,
    capability_type: CapabilityType,
    target: &ServerTarget,
) {
    // An absent type key renders nothing; the type simply is not offered.
    let Some(names) = target.allow_list(capability_type) else {
        return;
    };

    lines.push(format!("#### Available {}", capability_type));
    lines.extend(names.iter().map(|name| format!("- {}", name)));
}

fn mode_has_capabilities(mode: &Mode) -> bool {
    mode.values().any(ServerTarget::exposes_anything)
}
