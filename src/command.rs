use crate::env::Environment;
use crate::jobs::JobTable;
use crate::lexer::CommandLine;
use anyhow::Result;
use std::io::Write;

/// What the control loop does after a command has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop reading input and shut down.
    Exit,
}

/// Session state a command may use or change.
pub struct ExecContext<'a> {
    pub env: &'a Environment,
    pub jobs: &'a mut JobTable,
    /// Destination of the shell's own output. Children inherit the real
    /// standard streams instead.
    pub stdout: &'a mut dyn Write,
}

/// Object-safe trait for anything the dispatcher can run for one line.
///
/// Implemented by built-ins via a blanket impl and by external commands.
/// Recoverable failures are returned as [`crate::ShellError`] values; the
/// dispatcher reports them and keeps going.
pub trait ExecutableCommand {
    fn execute(self: Box<Self>, ctx: &mut ExecContext<'_>) -> Result<Flow>;
}

/// Factory that tries to create a command from a tokenized line.
///
/// Returns `None` when the factory doesn't recognize the line.
pub trait CommandFactory {
    fn try_create(&self, env: &Environment, line: &CommandLine) -> Option<Box<dyn ExecutableCommand>>;
}

/// Factory for the command types defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}
