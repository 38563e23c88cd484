mod tool;
mod toolset;

pub use tool::{AsyncTool, AsyncToolWrapper, Tool};
pub use toolset::{AsyncToolSet, SyncToolSet, ToolSetCreationError};
