//! Tool dispatch: execute a typed tool call over one of {HTTP endpoint,
//! MCP server, builtin}, normalizing results and errors onto the call
//! itself rather than propagating them as activity failures.

mod builtin;
mod dispatcher;
mod error;
mod lookup;

pub use builtin::{BuiltinRegistry, BuiltinTool};
pub use dispatcher::ToolDispatcher;
pub use error::ToolDispatchError;
pub use lookup::find_tool;
