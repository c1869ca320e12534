pub mod client;
pub mod frontend;
pub mod types;

pub use client::BackendClient;
pub use frontend::ProxyServer;
pub use types::{
    PromptDefinition, ResourceDefinition, ToolCallRequest, ToolCallResponse, ToolContent,
    ToolDefinition,
};
