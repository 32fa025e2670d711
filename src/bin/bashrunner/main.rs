mod manage;
mod mcp;
mod run;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use bashrunner::report::Palette;
use bashrunner::{default_store_dir, open_store};

#[derive(Parser, Debug)]
#[command(name = "bashrunner", about = "Store named shell commands and run them on demand")]
struct Cli {
    /// Directory holding the store and settings files (defaults to the platform config dir)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Store file, relative to the store directory (overrides the settings file)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Log file path (logs are also written to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log informational messages, not only warnings and errors
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List stored commands with their indices
    List,
    /// Show every field of one command
    Show(manage::IndexArgs),
    /// Store a new command at the end of the list
    Add(manage::AddArgs),
    /// Change fields of a stored command
    Edit(manage::EditArgs),
    /// Delete a stored command
    Remove(manage::IndexArgs),
    /// Swap a command with its neighbour
    Move(manage::MoveArgs),
    /// Move a command to another position
    MoveTo(manage::MoveToArgs),
    /// Run a stored command and print its output
    Run(run::RunArgs),
    /// Start an MCP server over stdio
    Mcp,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = cli.log_file.as_ref().map(std::fs::File::create).transpose()?;
    let level = if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    bashrunner::logger::init(log_file, level);

    let dir = cli.dir.unwrap_or_else(default_store_dir);
    let (mut store, _) = open_store(&dir, cli.file.as_deref())?;
    let palette = Palette::new(std::io::stdout().is_terminal());

    match cli.command {
        Commands::List => manage::list(&store, palette),
        Commands::Show(ref args) => manage::show(args, &store),
        Commands::Add(args) => manage::add(args, &mut store),
        Commands::Edit(args) => manage::edit(args, &mut store),
        Commands::Remove(ref args) => manage::remove(args, &mut store),
        Commands::Move(ref args) => manage::move_command(args, &mut store),
        Commands::MoveTo(ref args) => manage::move_to(args, &mut store),
        Commands::Run(ref args) => run::run(args, store, palette),
        Commands::Mcp => mcp::run(store),
    }
}
