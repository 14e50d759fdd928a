//! Where command lines come from.
//!
//! Interactive sessions read from the terminal through `rustyline`; batch
//! sessions read a script file and echo each line before it runs. Both
//! enforce the maximum line length.

use crate::config::{Mode, ShellConfig};
use crate::error::ShellError;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{trace, warn};

/// Supplies the dispatcher with one raw line at a time.
pub trait LineSource {
    /// Returns the next line without its terminating newline, or `None` at
    /// end of input.
    ///
    /// An over-length line is reported on `err` and replaced by an empty line.
    fn next_line(&mut self, out: &mut dyn Write, err: &mut dyn Write) -> Result<Option<String>>;
}

/// Builds the source selected by the configuration.
pub fn open(config: &ShellConfig) -> Result<Box<dyn LineSource>> {
    let source: Box<dyn LineSource> = match &config.mode {
        Mode::Interactive => Box::new(InteractiveSource::new(&config.prompt, config.max_line_len)?),
        Mode::Batch(path) => Box::new(BatchSource::open(path, config.max_line_len)?),
    };
    Ok(source)
}

/// Reads lines from the terminal, showing a prompt before each one.
pub struct InteractiveSource {
    editor: DefaultEditor,
    prompt: String,
    max_len: usize,
}

impl InteractiveSource {
    pub fn new(prompt: &str, max_len: usize) -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            prompt: prompt.to_owned(),
            max_len,
        })
    }
}

impl LineSource for InteractiveSource {
    fn next_line(&mut self, out: &mut dyn Write, err: &mut dyn Write) -> Result<Option<String>> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        warn!("history: {e}");
                    }
                }
                if line.len() > self.max_len {
                    writeln!(err, "{}", ShellError::LineTooLong)?;
                    return Ok(Some(String::new()));
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                writeln!(out)?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Reads lines from a script, echoing each to `out` as it is consumed.
pub struct BatchSource<R> {
    reader: R,
    max_len: usize,
}

impl BatchSource<BufReader<File>> {
    pub fn open(path: &Path, max_len: usize) -> Result<Self, ShellError> {
        let file = File::open(path).map_err(|source| ShellError::OpenBatchFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), max_len))
    }
}

impl<R: BufRead> BatchSource<R> {
    pub fn new(reader: R, max_len: usize) -> Self {
        Self { reader, max_len }
    }
}

impl<R: BufRead> LineSource for BatchSource<R> {
    fn next_line(&mut self, out: &mut dyn Write, err: &mut dyn Write) -> Result<Option<String>> {
        // At most one byte past the limit is buffered, however long the line.
        let mut buf = Vec::new();
        let limit = self.max_len as u64 + 1;
        if (&mut self.reader).take(limit).read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let content = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
        trace!(len = content.len(), "batch line read");

        if content.len() > self.max_len {
            // Only the part that fits is echoed; the rest of the line is dropped.
            self.reader.skip_until(b'\n')?;
            out.write_all(&content[..self.max_len])?;
            out.write_all(b"\n")?;
            out.flush()?;
            writeln!(err, "{}", ShellError::LineTooLong)?;
            return Ok(Some(String::new()));
        }

        out.write_all(content)?;
        out.write_all(b"\n")?;
        Ok(Some(String::from_utf8_lossy(content).into_owned()))
    }
}
