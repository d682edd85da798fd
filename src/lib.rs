//! A small interpreter for the eight-instruction tape language (`><+-.,[]`).
//!
//! Features and behaviors:
//! - The tape starts as one zero cell and grows to the right the first time the pointer
//!   moves past its end. Moving left from the first cell leaves the pointer where it is
//!   (see [`LeftEdge`] for the growing alternative).
//! - Cells are bytes; `+` and `-` wrap modulo 256.
//! - Every character outside the instruction set is a comment and is dropped when the
//!   [`Program`] is built. Brackets are not checked ahead of time.
//! - Loops are resolved as they run. By default only the most recently entered `[` is
//!   remembered, so an inner loop that exits makes the enclosing `]` fail with invalid loop
//!   control. [`LoopMode::Stack`] tracks every open `[` instead.
//! - Input `,` reads one byte; at end of input the cell is set per [`EofPolicy`].
//! - Every fault is fatal and is returned as an [`InterpreterError`] carrying a distinct
//!   [`exit code`](InterpreterError::exit_code).
//!
//! Quick start:
//!
//! ```no_run
//! use bf::{Interpreter, Options, Program};
//!
//! let program = Program::build("hi+++++++++[>++++++++<-]>. prints H").unwrap();
//! let mut out = Vec::new();
//! Interpreter::new(&program, Options::default())
//!     .run_with_io(std::io::empty(), &mut out)
//!     .expect("program should run");
//! assert_eq!(out, b"H");
//! ```

pub mod cli_util;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod program;
pub mod repl;
pub mod tape;
pub mod theme;

pub use config::Settings;
pub use engine::{EofPolicy, Interpreter, LoopMode, Options, StepControl};
pub use error::{CliError, InterpreterError, Resource};
pub use program::{Instruction, Position, Program};
pub use tape::{CellId, LeftEdge, Tape};
