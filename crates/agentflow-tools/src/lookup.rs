use agentflow_core::Tool;

/// Find a tool by name among those offered for this request. The workflow
/// uses this before scheduling `ExecuteTool`; a miss synthesizes a failed
/// call without ever invoking the dispatcher (spec §4.1 step 6).
#[must_use]
pub fn find_tool<'a>(tools: &'a [Tool], name: &str) -> Option<&'a Tool> {
    tools.iter().find(|t| t.name == name)
}
