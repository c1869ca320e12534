use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend not connected: {0}")]
    BackendNotConnected(String),

    #[error("Discovery failed for backend {backend}: {details}")]
    Discovery { backend: String, details: String },

    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        ProxyError::Config(msg.into())
    }

    pub fn discovery(backend: impl Into<String>, details: impl std::fmt::Display) -> Self {
        ProxyError::Discovery {
            backend: backend.into(),
            details: details.to_string(),
        }
    }
}
