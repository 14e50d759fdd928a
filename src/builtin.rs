use crate::command::{CommandFactory, ExecContext, ExecutableCommand, Factory, Flow};
use crate::env::Environment;
use crate::error::ShellError;
use crate::jobs::JobTable;
use crate::lexer::CommandLine;
use anyhow::Result;
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// A built-in is recognised by its name plus an exact argument count; a line
/// with the right name but the wrong arity is run as an external program.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "j" or "myw".
    fn name() -> &'static str;

    /// Builds the command from the tokens after its name, or `None` when
    /// they do not fit the built-in's grammar.
    fn from_args(args: &[String]) -> Option<Self>;

    /// Executes the command against the job table.
    fn execute(self, jobs: &mut JobTable, stdout: &mut dyn Write) -> Result<Flow>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, ctx: &mut ExecContext<'_>) -> Result<Flow> {
        <T as BuiltinCommand>::execute(*self, ctx.jobs, ctx.stdout)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>> {
        if line.name() != T::name() {
            return None;
        }
        T::from_args(line.arguments()).map(|cmd| Box::new(cmd) as Box<dyn ExecutableCommand>)
    }
}

/// `j`: list background jobs that are still running.
pub struct ListJobs;

impl BuiltinCommand for ListJobs {
    fn name() -> &'static str {
        "j"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        args.is_empty().then_some(ListJobs)
    }

    fn execute(self, jobs: &mut JobTable, stdout: &mut dyn Write) -> Result<Flow> {
        for (jid, display) in jobs.poll_and_list() {
            writeln!(stdout, "{} : {}", jid, display)?;
        }
        Ok(Flow::Continue)
    }
}

/// `myw <jid>`: wait for a background job and report how long that took.
pub struct WaitJob {
    /// The id exactly as typed; echoed back in messages about absent jobs.
    pub jid: String,
}

impl BuiltinCommand for WaitJob {
    fn name() -> &'static str {
        "myw"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        match args {
            [jid] => Some(WaitJob { jid: jid.clone() }),
            _ => None,
        }
    }

    fn execute(self, jobs: &mut JobTable, stdout: &mut dyn Write) -> Result<Flow> {
        let requested = parse_jid(&self.jid);
        match jobs.wait_on(requested) {
            Ok(report) if report.found => writeln!(
                stdout,
                "{} : Job {} terminated",
                report.elapsed.as_micros(),
                requested
            )?,
            Ok(_) => writeln!(stdout, "0 : Job {} terminated", self.jid)?,
            Err(_) => return Err(ShellError::InvalidJid(self.jid).into()),
        }
        Ok(Flow::Continue)
    }
}

/// `exit`: stop reading commands. Remaining jobs are reaped at shutdown.
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_args(args: &[String]) -> Option<Self> {
        args.is_empty().then_some(Exit)
    }

    fn execute(self, _jobs: &mut JobTable, _stdout: &mut dyn Write) -> Result<Flow> {
        Ok(Flow::Exit)
    }
}

/// Reads a job id the way C `atoi` does: optional sign, then leading digits.
/// Anything unparsable yields 0, which is never a valid id.
fn parse_jid(text: &str) -> i64 {
    let (negative, digits) = match text.as_bytes() {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        rest => (false, rest),
    };
    let value = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    if negative { -value } else { value }
}
