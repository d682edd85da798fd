use std::fmt;
use std::path::PathBuf;

use crate::program::Position;

/// Process exit statuses. Every fatal category gets its own value.
pub mod status {
    pub const SUCCESS: i32 = 0;
    /// No program file (or inline code) was supplied.
    pub const MISSING_FILE_NAME: i32 = 1;
    /// Bad flags, conflicting options, or an invalid configuration value.
    pub const USAGE: i32 = 2;
    /// Storage for a new instruction could not be obtained.
    pub const INSTRUCTION_STORAGE_EXHAUSTED: i32 = 4;
    /// Storage for a new tape cell could not be obtained (or `max_cells` was hit).
    pub const CELL_STORAGE_EXHAUSTED: i32 = 5;
    /// The source file is absent or unreadable.
    pub const NO_SUCH_FILE: i32 = 6;
    pub const INVALID_COMMAND: i32 = 7;
    /// A `]` with nothing to return to, or an unmatched `[` in the stack dialect.
    pub const INVALID_LOOP_CONTROL: i32 = 8;
    pub const IO_FAILURE: i32 = 9;
    pub const STEP_LIMIT_EXCEEDED: i32 = 10;
    pub const INTERRUPTED: i32 = 130;
}

/// What ran out while growing one of the interpreter's arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Instructions,
    Cells,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Instructions => write!(f, "instruction"),
            Resource::Cells => write!(f, "cell"),
        }
    }
}

/// Errors raised while building or executing a program.
#[derive(Debug, thiserror::Error)]
pub enum InterpreterError {
    /// A character outside `><+-.,[]` reached the engine.
    #[error("Invalid command '{ch}' at instruction {ip}")]
    InvalidCommand { ch: char, ip: Position },

    /// `]` was reached with no remembered `[` to return to.
    #[error("Invalid loop control at instruction {ip}: each ']' must have a matching '['")]
    InvalidLoopControl { ip: Position },

    /// Stack dialect only: `[` on a zero cell with no `]` to skip to.
    #[error("Invalid loop control at instruction {ip}: '[' has no matching ']'")]
    UnmatchedOpen { ip: Position },

    #[error("Unable to allocate memory for a new {resource}")]
    ResourceExhausted { resource: Resource },

    #[error("I/O error at instruction {ip}: {source}")]
    Io {
        ip: Position,
        #[source]
        source: std::io::Error,
    },

    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    #[error("Execution aborted: interrupted")]
    Interrupted,
}

impl InterpreterError {
    /// The instruction position the error is attached to, when there is one.
    pub fn position(&self) -> Option<Position> {
        match self {
            InterpreterError::InvalidCommand { ip, .. }
            | InterpreterError::InvalidLoopControl { ip }
            | InterpreterError::UnmatchedOpen { ip }
            | InterpreterError::Io { ip, .. } => Some(*ip),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            InterpreterError::InvalidCommand { .. } => status::INVALID_COMMAND,
            InterpreterError::InvalidLoopControl { .. } | InterpreterError::UnmatchedOpen { .. } => {
                status::INVALID_LOOP_CONTROL
            }
            InterpreterError::ResourceExhausted { resource: Resource::Instructions } => {
                status::INSTRUCTION_STORAGE_EXHAUSTED
            }
            InterpreterError::ResourceExhausted { resource: Resource::Cells } => {
                status::CELL_STORAGE_EXHAUSTED
            }
            InterpreterError::Io { .. } => status::IO_FAILURE,
            InterpreterError::StepLimitExceeded { .. } => status::STEP_LIMIT_EXCEEDED,
            InterpreterError::Interrupted => status::INTERRUPTED,
        }
    }
}

/// Errors raised at the process boundary, before the engine gets involved.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("no file name. Please provide a file name.")]
    MissingFileName,

    #[error("cannot read '{}': {source}", path.display())]
    NoSuchFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::MissingFileName => status::MISSING_FILE_NAME,
            CliError::NoSuchFile { .. } => status::NO_SUCH_FILE,
            CliError::Usage(_) | CliError::Config(_) => status::USAGE,
        }
    }
}
