use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ServerHandler, ServiceExt, tool, tool_handler, tool_router, transport::stdio};
use serde::Serialize;

use crate::commands::Command;
use crate::executor::ExecutionResult;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct ListCommandsParams {
    /// Filter by command name (case-insensitive substring match).
    #[schemars(default)]
    name: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct RunCommandParams {
    /// The command to run: either its index as shown by `list_commands`, or its name
    /// (case-insensitive exact match; the first match wins).
    command: String,
}

// ---------------------------------------------------------------------------
// Response structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CommandInfo {
    index: usize,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    content: String,
    description: String,
}

#[derive(Serialize)]
struct RunResult {
    index: usize,
    name: String,
    status: &'static str,
    exit_code: Option<i32>,
    failed_step: Option<usize>,
    failed_line: Option<String>,
    failure: Option<String>,
    steps_run: usize,
    duration_ms: u128,
    stdout: String,
    stderr: String,
}

impl RunResult {
    fn new(index: usize, command: &Command, result: ExecutionResult) -> Self {
        RunResult {
            index,
            name: command.name.clone(),
            status: if result.succeeded { "passed" } else { "failed" },
            exit_code: result.exit_code,
            failed_step: result.failed_step.as_ref().map(|s| s.position),
            failed_line: result.failed_step.map(|s| s.line),
            failure: result.failure.map(|f| f.to_string()),
            steps_run: result.steps_run,
            duration_ms: result.duration.as_millis(),
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerMcp {
    store: Arc<Store>,
    tool_router: ToolRouter<Self>,
}

/// Convert any `Display` error into an MCP internal error.
fn mcp_err(e: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(e.to_string(), None)
}

/// Resolve a command reference given as an index or a name.
fn find_command(store: &Store, target: &str) -> Option<usize> {
    let target = target.trim();
    if let Ok(index) = target.parse::<usize>() {
        return (index < store.len()).then_some(index);
    }
    store
        .commands()
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(target))
}

#[tool_router]
impl RunnerMcp {
    fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "List the stored commands in display order. Each entry has the index \
        used to run it, its name, its type (single: one shell line, multi: shell lines run \
        in order, script: path to an executable), its content and description."
    )]
    async fn list_commands(
        &self,
        Parameters(params): Parameters<ListCommandsParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let filter = params.name.map(|n| n.to_lowercase());
        let infos: Vec<CommandInfo> = self
            .store
            .commands()
            .iter()
            .enumerate()
            .filter(|(_, cmd)| {
                filter
                    .as_ref()
                    .is_none_or(|f| cmd.name.to_lowercase().contains(f))
            })
            .map(|(index, cmd)| CommandInfo {
                index,
                name: cmd.name.clone(),
                kind: cmd.kind.to_string(),
                content: cmd.content.clone(),
                description: cmd.description.clone(),
            })
            .collect();

        let json = serde_json::to_string_pretty(&infos).map_err(mcp_err)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(
        description = "Run one stored command by index or name and wait for it to finish. \
        Multi commands stop at the first failing line unless the store is configured to \
        continue. Returns pass/fail status, exit code, the failing line if any, stdout, \
        stderr, and timing."
    )]
    async fn run_command(
        &self,
        Parameters(params): Parameters<RunCommandParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let index = find_command(&self.store, &params.command).ok_or_else(|| {
            rmcp::ErrorData::invalid_params(format!("Command not found: {}", params.command), None)
        })?;

        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || {
            let execution = store.execute(index).map_err(mcp_err)?;
            Ok::<_, rmcp::ErrorData>(RunResult::new(index, &store.commands()[index], execution))
        })
        .await
        .map_err(mcp_err)??;

        let json = serde_json::to_string_pretty(&result).map_err(mcp_err)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for RunnerMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "bashrunner keeps a list of named shell commands, command sequences and \
                scripts. Use list_commands to see what is available and run_command to run \
                one by index or name. Runs are synchronous and return the captured output."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Start the MCP server over stdio.
///
/// # Errors
///
/// Returns an error if the MCP transport fails.
pub async fn run(store: Store) -> Result<(), Box<dyn std::error::Error>> {
    let server = RunnerMcp::new(store);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandKind;

    #[test]
    fn test_find_command_by_index_or_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::load(dir.path().join("commands.json"));
        store
            .add(Command::new("Build", CommandKind::Single, "make"))
            .unwrap();
        store
            .add(Command::new("Deploy", CommandKind::Single, "make deploy"))
            .unwrap();

        assert_eq!(find_command(&store, "1"), Some(1));
        assert_eq!(find_command(&store, "2"), None);
        assert_eq!(find_command(&store, "deploy"), Some(1));
        assert_eq!(find_command(&store, " BUILD "), Some(0));
        assert_eq!(find_command(&store, "test"), None);
    }
}
