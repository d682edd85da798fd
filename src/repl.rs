use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::Ordering;

use nu_ansi_term::Style;
use reedline::{DefaultPrompt, DefaultPromptSegment, Highlighter, HistoryItem, Reedline, Signal, StyledText};

use crate::cli_util;
use crate::config::Settings;
use crate::engine::{Interpreter, StepControl};
use crate::error::InterpreterError;
use crate::program::Program;
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Bare,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlagOverride {
    None,
    Bare,
    Editor,
}

/// Choose the REPL mode: flag, then `BF_REPL_MODE`, then auto-detect from stdin.
pub fn select_mode(flag: ModeFlagOverride) -> Result<ReplMode, String> {
    let stdin_is_tty = io::stdin().is_terminal();
    match flag {
        ModeFlagOverride::Bare => return Ok(ReplMode::Bare),
        ModeFlagOverride::Editor if !stdin_is_tty => {
            return Err("cannot start editor: stdin is not a TTY (use --bare or BF_REPL_MODE=bare)".to_string());
        }
        ModeFlagOverride::Editor => return Ok(ReplMode::Editor),
        ModeFlagOverride::None => {}
    }

    if let Ok(val) = env::var("BF_REPL_MODE") {
        return match val.trim().to_ascii_lowercase().as_str() {
            "bare" => Ok(ReplMode::Bare),
            "editor" if stdin_is_tty => Ok(ReplMode::Editor),
            "editor" => Err("cannot start editor: stdin is not a TTY (use BF_REPL_MODE=bare)".to_string()),
            _ => Err(format!("invalid BF_REPL_MODE value: {val}, must be 'bare' or 'editor'")),
        };
    }

    Ok(if stdin_is_tty { ReplMode::Editor } else { ReplMode::Bare })
}

/// Interactive session: each submission runs on a fresh tape.
pub fn repl_loop(settings: &Settings, control: &StepControl) -> io::Result<()> {
    let mut editor = init_line_editor()?;

    loop {
        let Some(submission) = read_submission_interactive(&mut editor)? else {
            // EOF or editor closed. End the session cleanly to avoid hanging when stdin is closed
            println!();
            io::stdout().flush()?;
            return Ok(());
        };

        if submission.trim().is_empty() {
            continue;
        }

        // A fault ends the submission, not the session.
        let _ = execute_submission(&submission, settings, control);

        // Test hook: if BF_REPL_ONCE=1, exit after one execution
        if env::var("BF_REPL_ONCE").ok().as_deref() == Some("1") {
            return Ok(());
        }
    }
}

/// Non-interactive session: the whole of stdin is one submission. Returns the fault that
/// ended it, if any.
pub fn execute_bare_once(settings: &Settings, control: &StepControl) -> io::Result<Option<InterpreterError>> {
    // The lock must be released before the program's own `,` reads stdin.
    let submission = read_submission(&mut io::BufReader::new(io::stdin().lock()));
    match submission {
        Some(submission) if !submission.trim().is_empty() => Ok(execute_submission(&submission, settings, control)),
        _ => Ok(None),
    }
}

fn init_line_editor() -> io::Result<Reedline> {
    use reedline::{default_emacs_keybindings, EditCommand, Emacs, FileBackedHistory, KeyCode, KeyModifiers, ReedlineEvent};

    // Enter inserts a newline; Ctrl+D (Ctrl+Z on Windows) submits the buffer.
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Edit(vec![EditCommand::InsertNewline]));
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('z'), ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Up, ReedlineEvent::PreviousHistory);
    keybindings.add_binding(KeyModifiers::ALT, KeyCode::Down, ReedlineEvent::NextHistory);

    let history = FileBackedHistory::new(1_000).map_err(|e| io::Error::other(e.to_string()))?;

    Ok(Reedline::create()
        .with_highlighter(Box::new(InstructionHighlighter))
        .with_history(Box::new(history))
        .with_edit_mode(Box::new(Emacs::new(keybindings))))
}

/// Collect all lines until EOF. `None` when nothing was read.
pub fn read_submission<R: io::BufRead>(stdin: &mut R) -> Option<String> {
    let mut buffer = String::new();
    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => buffer.push_str(&line),
            Err(_) => return None,
        }
    }
    if buffer.is_empty() { None } else { Some(buffer) }
}

fn read_submission_interactive(editor: &mut Reedline) -> io::Result<Option<String>> {
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Basic("bf".to_string()), DefaultPromptSegment::Empty);

    match editor.read_line(&prompt) {
        Ok(Signal::Success(buffer)) => {
            if !buffer.trim().is_empty() {
                let _ = editor.history_mut().save(HistoryItem::from_command_line(buffer.clone()));
            }
            Ok(Some(buffer))
        }
        Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => Ok(None),
        Err(e) => {
            eprintln!("repl: editor error: {e}");
            let _ = io::stderr().flush();
            Ok(None)
        }
    }
}

/// Run one submission. Output goes to stdout, errors are printed concisely to stderr, and a
/// newline always follows so the next prompt starts at column 0.
fn execute_submission(source: &str, settings: &Settings, control: &StepControl) -> Option<InterpreterError> {
    let fault = match Program::build(source) {
        Ok(program) => {
            let mut bf = Interpreter::new(&program, settings.options());
            let stdin = io::stdin();
            let stdout = io::stdout();
            let result = bf.run_with_control(stdin.lock(), stdout.lock(), control);
            if let Err(err) = &result {
                cli_util::print_interpreter_error(None, source, &program, err);
                if matches!(err, InterpreterError::Interrupted) {
                    // Ctrl+C only aborts the current submission.
                    control.cancel_flag.store(false, Ordering::Relaxed);
                }
            }
            result.err()
        }
        Err(err) => {
            eprintln!("{err}");
            let _ = io::stderr().flush();
            Some(err)
        }
    };
    println!();
    let _ = io::stdout().flush();
    fault
}

struct InstructionHighlighter;

impl Highlighter for InstructionHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut out = StyledText::new();
        let mut current: Option<Style> = None;
        let mut run = String::new();

        for ch in line.chars() {
            let style = theme::style_for(ch);
            if let Some(prev) = current.filter(|prev| *prev != style) {
                out.push((prev, std::mem::take(&mut run)));
            }
            current = Some(style);
            run.push(ch);
        }

        if let Some(style) = current {
            out.push((style, run));
        }
        out
    }
}
