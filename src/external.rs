use crate::command::{CommandFactory, ExecContext, ExecutableCommand, Factory, Flow};
use crate::env::Environment;
use crate::error::ShellError;
use crate::lexer::CommandLine;
use anyhow::Result;
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use tracing::{debug, warn};

/// Search path used when `PATH` is unset, as `execvp` does.
const DEFAULT_SEARCH_PATH: &str = "/bin:/usr/bin";

/// Command that is not a builtin.
pub struct ExternalCommand {
    args: Vec<String>,
    /// Set for background commands: the text recorded in the job table.
    display: Option<String>,
}

impl ExternalCommand {
    pub fn new(line: &CommandLine) -> Self {
        Self {
            args: line.args.clone(),
            display: line.display.clone(),
        }
    }

    fn name(&self) -> &str {
        &self.args[0]
    }

    /// Starts the child, distinguishing "cannot run this program" from a
    /// failure of the OS to create processes at all.
    fn spawn(&self, env: &Environment) -> Result<Child, ShellError> {
        let not_found = || ShellError::CommandNotFound(self.name().to_owned());
        let search_paths = env
            .get_var("PATH")
            .unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_owned());
        let program = find_command_path(
            OsStr::new(&search_paths),
            &env.current_dir,
            Path::new(self.name()),
        )
        .ok_or_else(not_found)?;

        let mut cmd = Command::new(&*program);
        cmd.args(&self.args[1..])
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(self.name());
        }

        cmd.spawn().map_err(|e| spawn_error(self.name(), e))
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    /// Accepts every line; registered last so built-ins take precedence.
    fn try_create(
        &self,
        _env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand::new(line)))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, ctx: &mut ExecContext<'_>) -> Result<Flow> {
        // Anything the shell printed must reach the terminal before the child writes.
        ctx.stdout.flush()?;

        let mut child = match self.spawn(ctx.env) {
            Ok(child) => child,
            Err(e @ ShellError::CommandNotFound(_)) => {
                // The program never ran, but the command still counts as a job.
                ctx.jobs.consume_jid();
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        debug!(pid = child.id(), args = ?self.args, background = self.display.is_some(), "spawned");

        match self.display {
            Some(display) => {
                ctx.jobs.insert(child, display);
            }
            None => {
                if let Err(e) = child.wait() {
                    warn!(pid = child.id(), "wait failed: {e}");
                }
                ctx.jobs.consume_jid();
            }
        }
        Ok(Flow::Continue)
    }
}

/// Only a system out of process resources is fatal. Any other failure
/// (missing file, no permission, unknown executable format, busy text file)
/// means this one program cannot be run.
fn spawn_error(name: &str, e: io::Error) -> ShellError {
    if is_resource_exhaustion(&e) {
        ShellError::Fork(e)
    } else {
        debug!(name, "spawn failed: {e}");
        ShellError::CommandNotFound(name.to_owned())
    }
}

/// `EAGAIN` and `ENOMEM` from process creation.
fn is_resource_exhaustion(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory
    )
}

/// Resolve a command path the way `execvp` would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - `./foo` or relative with multiple components (e.g., `bin/sh`): resolved
///   against `cwd`, returned if it exists.
/// - Single path component (no separators): search each directory in
///   `search_paths` (PATH) and return the first existing executable match.
/// - Empty path: returns `None`.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    cwd: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) if !path.starts_with(".") => {
            find_in_path(search_paths, cwd, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            let joined = cwd.join(path);
            find_by_path(&joined).map(|p| Cow::Owned(p.to_owned()))
        }
    }
}

fn find_in_path(search_paths: &OsStr, cwd: &Path, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        // An empty PATH entry means the current directory.
        let dir = if dir.as_os_str().is_empty() {
            cwd.to_path_buf()
        } else {
            cwd.join(dir)
        };
        let path = dir.join(cmd);
        // Like execvp, a match without execute permission does not stop the search.
        if find_by_path(&path).is_some() && is_executable(&path) {
            return Some(path);
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.is_file() { Some(path) } else { None }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobTable;
    use crate::lexer::{Tokenized, split_into_tokens};
    use std::collections::HashMap;
    use std::ffi::OsStr;
    use std::fs::{self, File};
    use std::os::unix::fs::PermissionsExt;

    fn write_executable(path: &Path, contents: &str, mode: u32) {
        // Closed before use so exec does not fail with ETXTBSY.
        fs::write(path, contents).expect("write file");
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    fn line(text: &str) -> CommandLine {
        match split_into_tokens(text) {
            Tokenized::Command(cmd) => cmd,
            Tokenized::Empty => panic!("empty line"),
        }
    }

    fn execute(text: &str, env: &Environment, jobs: &mut JobTable) -> Result<Flow> {
        let mut out: Vec<u8> = Vec::new();
        let mut ctx = ExecContext {
            env,
            jobs,
            stdout: &mut out,
        };
        Box::new(ExternalCommand::new(&line(text))).execute(&mut ctx)
    }

    #[test]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(osstr("/nowhere"), Path::new("/"), path)
            .expect("Expected to find /bin/sh via absolute path");
        assert_eq!(found.as_ref(), path);
    }

    #[test]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        let res = find_command_path(osstr("/bin"), Path::new("/"), path);
        assert!(res.is_none(), "Expected not to find /bin/nonexisting");
    }

    #[test]
    fn single_component_found_in_path() {
        let res = find_command_path(osstr("/nowhere:/bin"), Path::new("/"), Path::new("sh"));
        let found = res.expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(found.as_ref(), Path::new("/bin/sh"));
    }

    #[test]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new("nonexisting"));
        assert!(res.is_none(), "Expected not to find 'nonexisting' in PATH");
    }

    #[test]
    fn relative_paths_resolve_against_working_dir() {
        let tmp = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(tmp.path().join("bin")).expect("create bin dir");
        File::create(tmp.path().join("bin").join("tool")).expect("touch bin/tool");
        File::create(tmp.path().join("foo")).expect("touch foo");

        let found = find_command_path(osstr("/bin"), tmp.path(), Path::new("bin/tool"))
            .expect("Expected to find relative 'bin/tool'");
        assert_eq!(found.as_ref(), tmp.path().join("bin/tool"));

        let found = find_command_path(osstr("/bin"), tmp.path(), Path::new("./foo"))
            .expect("Expected to find './foo'");
        assert_eq!(found.as_ref(), tmp.path().join("foo"));

        // A bare name is never looked up in the working directory.
        assert!(find_command_path(osstr("/bin"), tmp.path(), Path::new("foo")).is_none());
    }

    #[test]
    fn path_search_skips_files_without_execute_permission() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let shadow = tmp.path().join("sh");
        write_executable(&shadow, "not a program\n", 0o644);

        let search = format!("{}:/bin:/usr/bin", tmp.path().display());
        let found = find_command_path(osstr(&search), Path::new("/"), Path::new("sh"))
            .expect("Expected the search to continue past the unexecutable match");
        assert!(!found.starts_with(tmp.path()), "picked {}", found.display());

        write_executable(&shadow, "not a program\n", 0o755);
        let found = find_command_path(osstr(&search), Path::new("/"), Path::new("sh"))
            .expect("Expected to find the executable match first");
        assert_eq!(found.as_ref(), shadow);
    }

    #[test]
    fn directories_are_not_commands() {
        assert!(find_command_path(osstr("/"), Path::new("/"), Path::new("bin")).is_none());
    }

    #[test]
    fn empty_path_is_none() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new(""));
        assert!(res.is_none(), "Empty path should not resolve to anything");
    }

    #[test]
    fn foreground_command_waits_and_consumes_an_id() {
        let env = Environment::new();
        let mut jobs = JobTable::new();
        assert_eq!(execute("true", &env, &mut jobs).unwrap(), Flow::Continue);
        assert!(jobs.is_empty());
        assert_eq!(jobs.last_issued(), 1);
    }

    #[test]
    fn background_command_is_tracked() {
        let env = Environment::new();
        let mut jobs = JobTable::new();
        execute("sleep 0.1 &", &env, &mut jobs).unwrap();
        assert_eq!(jobs.len(), 1);
        let listed: Vec<_> = jobs.poll_and_list().collect();
        assert_eq!(listed, vec![(1, "sleep 0.1".to_string())]);
        jobs.drain_blocking();
    }

    #[test]
    fn missing_program_is_reported_and_still_consumes_an_id() {
        let env = Environment::new();
        let mut jobs = JobTable::new();
        let err = execute("mysh-no-such-program --flag &", &env, &mut jobs).unwrap_err();
        assert_eq!(err.to_string(), "mysh-no-such-program: Command not found");
        assert!(jobs.is_empty());
        assert_eq!(jobs.last_issued(), 1);
    }

    #[test]
    fn only_resource_exhaustion_is_a_fork_failure() {
        for kind in [io::ErrorKind::WouldBlock, io::ErrorKind::OutOfMemory] {
            let err = spawn_error("prog", io::Error::from(kind));
            assert!(matches!(err, ShellError::Fork(_)), "{kind:?}");
            assert!(err.is_fatal());
        }
        for kind in [
            io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied,
            io::ErrorKind::InvalidInput,
            io::ErrorKind::Other,
        ] {
            let err = spawn_error("prog", io::Error::from(kind));
            assert_eq!(err.to_string(), "prog: Command not found", "{kind:?}");
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unknown_executable_format_is_not_found() {
        // ENOEXEC, ETXTBSY, ELOOP, E2BIG
        for errno in [8, 26, 40, 7] {
            let err = spawn_error("prog", io::Error::from_raw_os_error(errno));
            assert_eq!(err.to_string(), "prog: Command not found", "errno {errno}");
        }
    }

    #[test]
    fn executable_without_interpreter_line_never_ends_the_session() {
        let tmp = tempfile::tempdir().expect("temp dir");
        write_executable(&tmp.path().join("plain"), "exit 0\n", 0o755);
        let env = Environment {
            vars: HashMap::from([("PATH".to_string(), "/bin:/usr/bin".to_string())]),
            current_dir: tmp.path().to_path_buf(),
        };
        let mut jobs = JobTable::new();

        // Some C libraries hand such a file to /bin/sh; otherwise exec reports
        // ENOEXEC. Neither is a process-creation failure.
        match execute("./plain", &env, &mut jobs) {
            Ok(flow) => assert_eq!(flow, Flow::Continue),
            Err(e) => assert_eq!(e.to_string(), "./plain: Command not found"),
        }
        assert_eq!(jobs.last_issued(), 1);
        assert!(execute("true", &env, &mut jobs).is_ok());
    }

    #[test]
    fn non_executable_file_is_not_found() {
        let tmp = tempfile::tempdir().expect("temp dir");
        File::create(tmp.path().join("script")).expect("touch script");
        let env = Environment {
            vars: HashMap::from([("PATH".to_string(), tmp.path().display().to_string())]),
            current_dir: tmp.path().to_path_buf(),
        };
        let mut jobs = JobTable::new();
        let err = execute("script", &env, &mut jobs).unwrap_err();
        assert_eq!(err.to_string(), "script: Command not found");
    }
}
