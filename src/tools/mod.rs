//! Tool descriptors, argument access, and stage tool handlers.

pub mod arguments;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use tool::{StageTool, ToolContext, ToolOutput};
pub use types::{ToolDescriptor, ToolParameters};
