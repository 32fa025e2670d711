use std::io::Read;
use std::process::ExitCode;

use clap::{Args, ValueEnum};

use bashrunner::commands::{Command, CommandKind};
use bashrunner::report::{Palette, format_listing};
use bashrunner::store::{Direction, Store};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    /// One shell command line
    Single,
    /// Several shell lines, run in order
    Multi,
    /// Path to an executable script
    Script,
}

impl From<KindArg> for CommandKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Single => CommandKind::Single,
            KindArg::Multi => CommandKind::Multi,
            KindArg::Script => CommandKind::Script,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DirectionArg {
    Up,
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Position of the command, as shown by `list`
    index: usize,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name
    name: String,

    /// How the content is run
    #[arg(short = 't', long = "type", value_enum, default_value = "single")]
    kind: KindArg,

    /// Command line, or script path; repeat for each line of a multi command
    #[arg(short, long = "content", required_unless_present = "stdin")]
    content: Vec<String>,

    /// Read the content from stdin instead
    #[arg(long, conflicts_with = "content")]
    stdin: bool,

    /// Free-text note shown next to the name
    #[arg(short = 'D', long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Position of the command, as shown by `list`
    index: usize,

    #[arg(short, long)]
    name: Option<String>,

    #[arg(short = 't', long = "type", value_enum)]
    kind: Option<KindArg>,

    /// Replacement content; repeat for each line of a multi command
    #[arg(short, long = "content")]
    content: Vec<String>,

    /// Read the replacement content from stdin
    #[arg(long, conflicts_with = "content")]
    stdin: bool,

    #[arg(short = 'D', long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Position of the command, as shown by `list`
    index: usize,

    #[arg(value_enum)]
    direction: DirectionArg,
}

#[derive(Args, Debug)]
pub struct MoveToArgs {
    from: usize,
    to: usize,
}

/// Join repeated `--content` values, or read stdin when asked to.
fn read_content(lines: Vec<String>, stdin: bool) -> Result<Option<String>, std::io::Error> {
    if stdin {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(Some(content));
    }
    if lines.is_empty() {
        Ok(None)
    } else {
        Ok(Some(lines.join("\n")))
    }
}

#[allow(clippy::unnecessary_wraps)]
pub fn list(store: &Store, palette: Palette) -> Result<ExitCode, Box<dyn std::error::Error>> {
    println!("{}", format_listing(store.commands(), palette));
    Ok(ExitCode::SUCCESS)
}

/// Print one command.
///
/// # Errors
///
/// Returns an error if `index` is out of range.
pub fn show(args: &IndexArgs, store: &Store) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = store
        .get(args.index)
        .ok_or_else(|| format!("no command at index {}", args.index))?;
    println!("name:        {}", cmd.name);
    println!("type:        {}", cmd.kind);
    println!("description: {}", cmd.description);
    println!("content:");
    for line in cmd.content.lines() {
        println!("  {line}");
    }
    Ok(ExitCode::SUCCESS)
}

/// Store a new command.
///
/// # Errors
///
/// Returns an error if the command is invalid or could not be saved.
pub fn add(args: AddArgs, store: &mut Store) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let content = read_content(args.content, args.stdin)?.unwrap_or_default();
    let command = Command::new(args.name, args.kind.into(), content)
        .with_description(args.description.unwrap_or_default());
    let index = store.add(command)?;
    println!("Added command at index {index}");
    Ok(ExitCode::SUCCESS)
}

/// Replace the given fields of a stored command.
///
/// # Errors
///
/// Returns an error if the index is out of range, the result is invalid, or it could not be
/// saved.
pub fn edit(args: EditArgs, store: &mut Store) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut command: Command = store
        .get(args.index)
        .cloned()
        .ok_or_else(|| format!("no command at index {}", args.index))?;
    if let Some(name) = args.name {
        command.name = name;
    }
    if let Some(kind) = args.kind {
        command.kind = kind.into();
    }
    if let Some(content) = read_content(args.content, args.stdin)? {
        command.content = content;
    }
    if let Some(description) = args.description {
        command.description = description;
    }
    store.update(args.index, command)?;
    println!("Updated command at index {}", args.index);
    Ok(ExitCode::SUCCESS)
}

/// Delete a stored command.
///
/// # Errors
///
/// Returns an error if the index is out of range or the change could not be saved.
pub fn remove(
    args: &IndexArgs,
    store: &mut Store,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let removed = store.delete(args.index)?;
    println!("Removed '{}'", removed.name);
    Ok(ExitCode::SUCCESS)
}

/// Swap a command with its neighbour.
///
/// # Errors
///
/// Returns an error if the command cannot move that way or the change could not be saved.
pub fn move_command(
    args: &MoveArgs,
    store: &mut Store,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let index = store.move_command(args.index, args.direction.into())?;
    println!("Moved command to index {index}");
    Ok(ExitCode::SUCCESS)
}

/// Move a command to an arbitrary position.
///
/// # Errors
///
/// Returns an error if either index is out of range or the change could not be saved.
pub fn move_to(
    args: &MoveToArgs,
    store: &mut Store,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    store.relocate(args.from, args.to)?;
    println!("Moved command to index {}", args.to);
    Ok(ExitCode::SUCCESS)
}
