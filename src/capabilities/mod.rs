pub mod bundle;
pub mod resolver;

pub use bundle::{build_bundles, CapabilitySet, ClientBundle};
pub use resolver::{is_included, Capability, CapabilityType};
