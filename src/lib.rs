//! A small job-control shell.
//!
//! `mysh` reads one command per line, either interactively or from a batch
//! file, and runs it as an external program in the foreground or, when the
//! line ends with `&`, in the background. Background jobs are tracked in a
//! [`JobTable`] and managed with three built-ins:
//!
//! - `j` lists the jobs still running, as `<jid> : <command>`;
//! - `myw <jid>` waits for a job and prints how many microseconds that took;
//! - `exit` ends the session.
//!
//! Every job still running when the session ends is waited for before the
//! shell exits.
//!
//! The main entry point is [`Interpreter`], driven by a [`LineSource`].

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod jobs;
pub mod lexer;
pub mod line_source;

pub use error::ShellError;
pub use interpreter::Interpreter;
pub use jobs::JobTable;
pub use line_source::{BatchSource, InteractiveSource, LineSource};
