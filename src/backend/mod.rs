pub mod connect;
pub mod traits;

pub use connect::connect_backends;
pub use traits::{BackendHandle, DeclaredSupport};
