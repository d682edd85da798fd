use std::io::{self, Write};

use crate::error::InterpreterError;
use crate::program::Program;

/// Pretty-print an [`InterpreterError`] with caret positioning into `source`.
/// If `program_name` is `Some("bf")`, messages are prefixed with "bf: ...".
pub fn print_interpreter_error(program_name: Option<&str>, source: &str, program: &Program, err: &InterpreterError) {
    let msg = match program_name {
        Some(p) => format!("{p}: {}", describe(err)),
        None => describe(err),
    };

    match err.position() {
        Some(ip) => print_error_with_context(&msg, source, ip.index(), program.source_offset(ip)),
        None => {
            eprintln!("{msg}");
            let _ = io::stderr().flush();
        }
    }
}

fn describe(err: &InterpreterError) -> String {
    match err {
        InterpreterError::InvalidCommand { ch, .. } => format!("Error: invalid command '{ch}' encountered"),
        InterpreterError::InvalidLoopControl { .. } => {
            "Error: invalid loop control. Each ']' must have a matching '['".to_string()
        }
        InterpreterError::UnmatchedOpen { .. } => {
            "Error: invalid loop control. Each '[' must have a matching ']'".to_string()
        }
        InterpreterError::ResourceExhausted { resource } => {
            format!("Error: unable to allocate memory for a new {resource}")
        }
        InterpreterError::Io { source, .. } => format!("I/O error: {source}"),
        other => other.to_string(),
    }
}

/// Print a concise error with instruction index and a caret context window,
/// working with UTF-8 by slicing using char indices.
pub fn print_error_with_context(prefix: &str, code: &str, ip: usize, char_pos: usize) {
    eprint!("{}", render_context(prefix, code, ip, char_pos));
    let _ = io::stderr().flush();
}

fn render_context(prefix: &str, code: &str, ip: usize, char_pos: usize) -> String {
    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let total_chars = code.chars().count();
    let start_char = char_pos.saturating_sub(WINDOW_CHARS);
    let end_char = (char_pos + WINDOW_CHARS + 1).min(total_chars);

    // Newlines would break the caret alignment.
    let slice: String = code
        .chars()
        .skip(start_char)
        .take(end_char.saturating_sub(start_char))
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    // Caret under the exact position
    let caret = format!("{}^", " ".repeat(char_pos.saturating_sub(start_char)));
    format!("{prefix} at instruction {ip}\n  {slice}\n  {caret}\n")
}
