use crate::error::ShellError;
use argh::FromArgs;
use std::path::PathBuf;

/// Prompt shown before every interactive read.
pub const PROMPT: &str = "mysh> ";

/// Longest accepted command line, excluding the newline.
pub const MAX_LINE_LEN: usize = 512;

/// Environment variable holding the log filter (`tracing_subscriber::EnvFilter` syntax).
pub const LOG_ENV: &str = "MYSH_LOG";

#[derive(FromArgs, Debug)]
/// Run commands typed at the terminal, or every line of a batch file.
pub struct Args {
    #[argh(positional)]
    /// script to execute instead of reading from the terminal.
    pub batch_file: Option<PathBuf>,
}

/// Where the session reads its commands from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    Batch(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub mode: Mode,
    pub prompt: String,
    pub max_line_len: usize,
}

impl From<Args> for ShellConfig {
    fn from(args: Args) -> Self {
        let mode = match args.batch_file {
            Some(path) => Mode::Batch(path),
            None => Mode::Interactive,
        };
        Self {
            mode,
            prompt: PROMPT.to_owned(),
            max_line_len: MAX_LINE_LEN,
        }
    }
}

/// Parses the program arguments (without the program name).
///
/// Zero arguments select interactive mode and exactly one names the batch
/// script, whatever it looks like. Anything more is the usage error.
pub fn parse_args(command: &str, args: &[&str]) -> Result<ShellConfig, ShellError> {
    if args.len() > 1 {
        return Err(ShellError::Usage);
    }
    let parsed = match Args::from_args(&[command], args) {
        Ok(parsed) if parsed.batch_file.is_some() || args.is_empty() => parsed,
        // argh claims words such as `-x`, `--help` or `--`; they still name the script.
        _ => Args {
            batch_file: args.first().map(|path| PathBuf::from(*path)),
        },
    };
    Ok(parsed.into())
}
