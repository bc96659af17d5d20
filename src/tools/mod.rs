pub mod executor;
pub mod filesystem;
pub mod registry;
pub mod schema;
pub mod site;

pub use executor::ToolExecutor;
pub use filesystem::{
    AppendFileTool, CreateFileTool, DeleteFileTool, ListFilesTool, ReadFileTool, SafeFs,
};
pub use registry::{Tool, ToolDefinition, ToolOutput, ToolRegistry};
pub use schema::{parameters_schema_for, parse_args};
pub use site::{GenerateSiteTool, PreviewLinkTool};
