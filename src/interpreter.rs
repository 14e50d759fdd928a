use crate::command::{CommandFactory, ExecContext, ExecutableCommand, Factory, Flow};
use crate::env::Environment;
use crate::error::ShellError;
use crate::jobs::JobTable;
use crate::lexer::{self, CommandLine, Tokenized};
use crate::line_source::LineSource;
use anyhow::Result;
use std::io::{self, Write};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Terminated,
}

/// The command dispatcher: reads lines, runs built-ins and external
/// programs, and owns the table of background jobs.
///
/// Commands are created by asking each [`CommandFactory`] in turn; see
/// [`Default`] for the set used by the `mysh` binary.
///
/// Example
/// ```
/// use mysh::{BatchSource, Interpreter};
/// use std::io::Cursor;
///
/// let mut source = BatchSource::new(Cursor::new(b"true &\nmyw 1\n".to_vec()), 512);
/// let (mut out, mut err): (Vec<u8>, Vec<u8>) = (Vec::new(), Vec::new());
/// Interpreter::default().run_with_output(&mut source, &mut out, &mut err).unwrap();
/// assert!(String::from_utf8(out).unwrap().ends_with(" : Job 1 terminated\n"));
/// ```
pub struct Interpreter {
    env: Environment,
    jobs: JobTable,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            jobs: JobTable::new(),
            commands,
        }
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Runs a session on the process's standard streams.
    pub fn run(&mut self, source: &mut dyn LineSource) -> Result<()> {
        self.run_with_output(source, &mut io::stdout(), &mut io::stderr())
    }

    /// Runs commands from `source` until `exit` or end of input, then waits
    /// for every background job still in the table.
    ///
    /// Returns an error only for fatal conditions; the jobs table is left
    /// as is in that case.
    pub fn run_with_output(
        &mut self,
        source: &mut dyn LineSource,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<()> {
        let mut state = State::Running;
        while state == State::Running {
            state = self.step(source, out, err)?;
            out.flush()?;
        }
        self.shutdown();
        Ok(())
    }

    /// One dispatch iteration: read, tokenize, classify, execute.
    fn step(
        &mut self,
        source: &mut dyn LineSource,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<State> {
        let Some(raw) = source.next_line(out, err)? else {
            debug!("end of input");
            return Ok(State::Terminated);
        };
        let line = match lexer::split_into_tokens(&raw) {
            Tokenized::Empty => return Ok(State::Running),
            Tokenized::Command(line) => line,
        };

        let Some(cmd) = self.create(&line) else {
            return report(ShellError::CommandNotFound(line.name().to_owned()), out, err);
        };
        let mut ctx = ExecContext {
            env: &self.env,
            jobs: &mut self.jobs,
            stdout: &mut *out,
        };
        match cmd.execute(&mut ctx) {
            Ok(Flow::Continue) => Ok(State::Running),
            Ok(Flow::Exit) => Ok(State::Terminated),
            Err(e) => match e.downcast::<ShellError>() {
                Ok(e) if !e.is_fatal() => report(e, out, err),
                Ok(e) => Err(e.into()),
                Err(e) => Err(e),
            },
        }
    }

    fn create(&self, line: &CommandLine) -> Option<Box<dyn ExecutableCommand>> {
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, line))
    }

    fn shutdown(&mut self) {
        debug!(remaining = self.jobs.len(), "reaping background jobs");
        self.jobs.drain_blocking();
    }
}

/// Prints a recoverable error and keeps the session running.
fn report(e: ShellError, out: &mut dyn Write, err: &mut dyn Write) -> Result<State> {
    out.flush()?;
    writeln!(err, "{}", e)?;
    Ok(State::Running)
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `j`, `myw`, `exit`
    /// - external command launcher, consulted last
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<ListJobs>::default()),
            Box::new(Factory::<WaitJob>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
