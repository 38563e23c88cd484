mod tool_object;
#[allow(clippy::module_inception)]
mod toolset;
mod types;

pub use toolset::{AsyncToolSet, SyncToolSet};
pub use types::ToolSetCreationError;
