pub mod router;
pub(crate) mod switch;

pub use router::{Router, CHANGE_MODE_TOOL, LIST_MODES_TOOL};
