//! Built-in SQL tools

mod execute_sql;
mod get_chunk;
mod list_workspaces;
mod session_info;

pub use execute_sql::ExecuteSqlTool;
pub use get_chunk::GetChunkTool;
pub use list_workspaces::ListWorkspacesTool;
pub use session_info::SessionInfoTool;
