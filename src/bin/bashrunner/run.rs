use std::io::Write;
use std::process::ExitCode;

use clap::Args;

use bashrunner::executor::MultiPolicy;
use bashrunner::report::{Palette, format_result, format_start_message};
use bashrunner::store::Store;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Position of the command, as shown by `list`
    index: usize,

    /// Keep running the remaining lines of a multi command after one fails
    #[arg(long)]
    continue_on_error: bool,

    /// Do not print the captured output of a successful run
    #[arg(long)]
    mute_success: bool,
}

/// Run a stored command and report the result.
///
/// # Errors
///
/// Returns an error if `index` is out of range. A failed execution is reported through the
/// exit code.
pub fn run(
    args: &RunArgs,
    store: Store,
    palette: Palette,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = if args.continue_on_error {
        let executor = store.executor().clone().with_policy(MultiPolicy::Continue);
        store.with_executor(executor)
    } else {
        store
    };

    let command = store
        .get(args.index)
        .ok_or_else(|| format!("no command at index {}", args.index))?;
    eprintln!("{}", format_start_message(command, palette));

    let result = store.execute(args.index)?;

    if !(result.succeeded && args.mute_success) {
        let _ = std::io::stdout().write_all(result.stdout.as_bytes());
        let _ = std::io::stderr().write_all(result.stderr.as_bytes());
    }
    eprintln!("{}", format_result(&result, palette));

    if result.succeeded {
        return Ok(ExitCode::SUCCESS);
    }
    // Pass the command's own status through when it fits in an exit code
    Ok(result
        .exit_code
        .and_then(|code| u8::try_from(code).ok())
        .filter(|&code| code != 0)
        .map_or(ExitCode::FAILURE, ExitCode::from))
}
