use std::process::ExitCode;

use bashrunner::store::Store;

/// Start the MCP server over stdio.
///
/// # Errors
///
/// Returns an error if the runtime cannot start or the MCP transport fails.
pub fn run(store: Store) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(bashrunner::mcp::run(store))?;
    Ok(ExitCode::SUCCESS)
}
