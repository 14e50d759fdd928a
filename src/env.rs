use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Snapshot of the process environment that child processes are started with.
///
/// The shell never modifies it after startup; it exists so tests can run
/// commands against a controlled `PATH` and working directory.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables passed to every child (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// Working directory of every child.
    pub current_dir: PathBuf,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Capture the current process state.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Get the value of a variable from the snapshot.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
