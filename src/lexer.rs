//! Lexical analysis of a single command line.
//!
//! A line is trimmed, checked for a trailing background marker and split on
//! blanks into owned tokens. No quoting or substitution is performed.

/// Marks a command for background execution when it ends the line.
pub const BACKGROUND_MARKER: char = '&';

/// Characters that separate tokens.
const DELIMITERS: [char; 3] = [' ', '\t', '\n'];

/// One tokenized command, valid for a single dispatch iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Argument vector; the first element is the program or built-in name.
    pub args: Vec<String>,
    /// Whether the line ended with the background marker.
    pub background: bool,
    /// Canonical text recorded in the job table for background commands.
    pub display: Option<String>,
}

impl CommandLine {
    /// Program or built-in name.
    pub fn name(&self) -> &str {
        &self.args[0]
    }

    /// Arguments following the name.
    pub fn arguments(&self) -> &[String] {
        &self.args[1..]
    }
}

/// Result of tokenizing one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tokenized {
    /// Nothing to execute: blank line, or a lone background marker.
    Empty,
    Command(CommandLine),
}

fn is_space(ch: char) -> bool {
    // C isspace(): includes vertical tab, which char::is_ascii_whitespace does not.
    ch.is_ascii_whitespace() || ch == '\x0b'
}

/// Trims leading and trailing whitespace.
pub fn normalize(line: &str) -> &str {
    line.trim_matches(is_space)
}

/// Removes a trailing background marker, returning the remaining text and
/// whether the marker was present.
///
/// When the marker is preceded by whitespace that single character goes too;
/// otherwise the marker is fused to the last token and only it is dropped.
fn strip_background_marker(line: &str) -> (&str, bool) {
    let Some(rest) = line.strip_suffix(BACKGROUND_MARKER) else {
        return (line, false);
    };
    match rest.chars().next_back() {
        Some(prev) if is_space(prev) => (&rest[..rest.len() - prev.len_utf8()], true),
        _ => (rest, true),
    }
}

/// Splits `line` into a [`CommandLine`].
///
/// Returns [`Tokenized::Empty`] when the line holds no command at all.
pub fn split_into_tokens(line: &str) -> Tokenized {
    let (text, background) = strip_background_marker(normalize(line));

    let args: Vec<String> = text
        .split(DELIMITERS)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect();
    if args.is_empty() {
        return Tokenized::Empty;
    }

    let display = background.then(|| args.join(" "));
    Tokenized::Command(CommandLine {
        args,
        background,
        display,
    })
}
