pub mod backend;
pub mod capabilities;
pub mod config;
pub(crate) mod error;
pub mod formatting;
pub mod mcp;
pub mod routing;

pub use error::{ProxyError, Result};
