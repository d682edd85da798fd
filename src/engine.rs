//! The execution engine.
//!
//! An [`Interpreter`] walks a [`Program`] one instruction at a time, mutating its own
//! [`Tape`] until the end-of-program sentinel is fetched. Loops are resolved lazily: by
//! default the engine remembers only the most recently entered `[` (a single bookmark).
//! [`LoopMode::Stack`] switches to a stack of
//! open positions with forward skipping, which changes observable behavior for nested loops
//! and for loops entered on a zero cell.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::InterpreterError;
use crate::program::{Instruction, Position, Program};
use crate::tape::{CellId, LeftEdge, Tape};

/// How `[` and `]` find each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LoopMode {
    /// One remembered `[`. `[` always enters its body; an exited inner loop forgets the
    /// enclosing one, so the enclosing `]` then fails with invalid loop control.
    #[default]
    Bookmark,
    /// A stack of open `[` positions. `[` on a zero cell skips past its matching `]`.
    Stack,
}

/// What `,` stores when the input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EofPolicy {
    #[default]
    Zero,
    Unchanged,
    /// Store 255 (-1 as a signed byte).
    #[value(name = "max")]
    MaxValue,
}

/// Dialect and resource options for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Options {
    pub loop_mode: LoopMode,
    pub left_edge: LeftEdge,
    pub eof: EofPolicy,
    pub max_cells: Option<usize>,
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone, Debug, Default)]
pub struct StepControl {
    pub max_steps: Option<usize>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<usize>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }

    fn check(&self, steps: usize) -> Result<(), InterpreterError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(InterpreterError::Interrupted);
        }
        match self.max_steps {
            Some(limit) if steps >= limit => Err(InterpreterError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
enum LoopState {
    Bookmark(Option<Position>),
    Stack(Vec<Position>),
}

impl LoopState {
    fn fresh(mode: LoopMode) -> Self {
        match mode {
            LoopMode::Bookmark => LoopState::Bookmark(None),
            LoopMode::Stack => LoopState::Stack(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    // Print a step table; '.' is suppressed and ',' sees end of input.
    Debug,
}

/// What a single instruction did, for the debug table.
#[derive(Debug, Clone, Copy)]
enum Action {
    Moved(isize),
    Changed { op: &'static str, cell: isize, from: u8, to: u8 },
    Wrote(u8),
    Suppressed(u8),
    Read(u8),
    ReadEof(u8),
    Bookmarked(Position),
    Pushed(Position),
    Skipped(Position),
    JumpedBack(Position),
    Exited,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Action::Moved(index) => write!(f, "Moved pointer head to index {index}"),
            Action::Changed { op, cell, from, to } => write!(f, "{op} cell[{cell}] from {from} to {to}"),
            Action::Wrote(byte) => write!(f, "Output byte {byte}"),
            Action::Suppressed(byte) => write!(f, "Output byte {byte} (suppressed in debug)"),
            Action::Read(byte) => write!(f, "Read byte from input -> {byte}"),
            Action::ReadEof(byte) => write!(f, "Read byte from input -> end of input (cell is {byte})"),
            Action::Bookmarked(ip) => write!(f, "Bookmark loop start at IP {ip}"),
            Action::Pushed(ip) => write!(f, "Enter loop at IP {ip}"),
            Action::Skipped(ip) => write!(f, "Cell is 0; skip forward to matching ']' at IP {ip}"),
            Action::JumpedBack(ip) => write!(f, "Cell != 0; jump back to '[' at IP {ip}"),
            Action::Exited => write!(f, "Exit loop (cell is 0)"),
        }
    }
}

/// Runs one [`Program`] against a private tape.
///
/// Every `run*` call starts from a fresh tape, pointers and loop state, so running the same
/// program twice with the same input gives the same output.
pub struct Interpreter<'p> {
    program: &'p Program,
    options: Options,
    tape: Tape,
    ip: Position,
    dp: CellId,
    loops: LoopState,
    steps: usize,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, options: Options) -> Self {
        let tape = Tape::new(options.left_edge, options.max_cells);
        let dp = tape.origin();
        Self {
            program,
            options,
            tape,
            ip: program.start(),
            dp,
            loops: LoopState::fresh(options.loop_mode),
            steps: 0,
        }
    }

    /// Execute against stdin and stdout.
    pub fn run(&mut self) -> Result<(), InterpreterError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.execute(&mut stdin.lock(), &mut stdout.lock(), Mode::Normal, None)
    }

    pub fn run_with_io<R: Read, W: Write>(&mut self, mut input: R, mut output: W) -> Result<(), InterpreterError> {
        self.execute(&mut input, &mut output, Mode::Normal, None)
    }

    /// Execute with cooperative cancellation and an optional step limit.
    pub fn run_with_control<R: Read, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
        control: &StepControl,
    ) -> Result<(), InterpreterError> {
        self.execute(&mut input, &mut output, Mode::Normal, Some(control))
    }

    /// Debug-run the program, writing a step-by-step table of operations to `table`
    /// instead of producing I/O side effects. The tape and pointers advance exactly as in a
    /// real run, except that `.` prints nothing and `,` sees end of input.
    pub fn run_debug<W: Write>(&mut self, mut table: W, control: Option<&StepControl>) -> Result<(), InterpreterError> {
        self.execute(&mut io::empty(), &mut table, Mode::Debug, control)
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn data_pointer(&self) -> CellId {
        self.dp
    }

    /// Instructions executed by the last run, sentinel excluded.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn reset(&mut self) {
        self.tape = Tape::new(self.options.left_edge, self.options.max_cells);
        self.dp = self.tape.origin();
        self.ip = self.program.start();
        self.loops = LoopState::fresh(self.options.loop_mode);
        self.steps = 0;
    }

    fn execute<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
        mode: Mode,
        control: Option<&StepControl>,
    ) -> Result<(), InterpreterError> {
        self.reset();
        debug!(
            instructions = self.program.len(),
            loop_mode = ?self.options.loop_mode,
            left_edge = ?self.options.left_edge,
            "starting run"
        );

        if mode == Mode::Debug {
            writeln!(output, "STEP | IP  | PTR | CELL | INSTR | ACTION")
                .and_then(|_| writeln!(output, "-----+-----+-----+------+-------+------------------------------------------------"))
                .map_err(|source| InterpreterError::Io { ip: self.ip, source })?;
        }

        let result = self.drive(input, output, mode, control);

        // Whatever happened, bytes already emitted should reach the sink.
        let flushed = output.flush().map_err(|source| InterpreterError::Io { ip: self.ip, source });
        match &result {
            Ok(()) => debug!(steps = self.steps, cells = self.tape.len(), "halted"),
            Err(err) => debug!(steps = self.steps, error = %err, "aborted"),
        }
        result.and(flushed)
    }

    fn drive<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
        mode: Mode,
        control: Option<&StepControl>,
    ) -> Result<(), InterpreterError> {
        loop {
            let (instruction, next) = self.program.next_instruction(self.ip);
            if instruction == Instruction::End {
                return Ok(());
            }

            if let Some(ctrl) = control {
                ctrl.check(self.steps)?;
            }

            let (ptr_before, cell_before) = (self.tape.index_of(self.dp), self.tape.read(self.dp));
            let (next, action) = self.step(instruction, next, input, output, mode)?;

            if mode == Mode::Debug {
                writeln!(
                    output,
                    "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
                    self.steps,
                    self.ip,
                    ptr_before,
                    cell_before,
                    instruction.symbol(),
                    action
                )
                .map_err(|source| InterpreterError::Io { ip: self.ip, source })?;
            }

            self.steps += 1;
            self.ip = next;
        }
    }

    /// Apply one instruction. Returns the position to execute next.
    fn step<R: Read, W: Write>(
        &mut self,
        instruction: Instruction,
        next: Position,
        input: &mut R,
        output: &mut W,
        mode: Mode,
    ) -> Result<(Position, Action), InterpreterError> {
        let ip = self.ip;
        let action = match instruction {
            Instruction::MoveRight => {
                self.dp = self.tape.move_right(self.dp)?;
                Action::Moved(self.tape.index_of(self.dp))
            }
            Instruction::MoveLeft => {
                self.dp = self.tape.move_left(self.dp)?;
                Action::Moved(self.tape.index_of(self.dp))
            }
            Instruction::Increment => {
                let from = self.tape.read(self.dp);
                self.tape.increment(self.dp);
                Action::Changed { op: "Increment", cell: self.tape.index_of(self.dp), from, to: self.tape.read(self.dp) }
            }
            Instruction::Decrement => {
                let from = self.tape.read(self.dp);
                self.tape.decrement(self.dp);
                Action::Changed { op: "Decrement", cell: self.tape.index_of(self.dp), from, to: self.tape.read(self.dp) }
            }
            Instruction::Output => {
                let byte = self.tape.read(self.dp);
                if mode == Mode::Debug {
                    Action::Suppressed(byte)
                } else {
                    output.write_all(&[byte]).map_err(|source| InterpreterError::Io { ip, source })?;
                    Action::Wrote(byte)
                }
            }
            Instruction::Input => {
                if mode == Mode::Normal {
                    // A prompt written just before `,` should be visible while we block.
                    output.flush().map_err(|source| InterpreterError::Io { ip, source })?;
                }
                match read_byte(input).map_err(|source| InterpreterError::Io { ip, source })? {
                    Some(byte) => {
                        self.tape.write(self.dp, byte);
                        Action::Read(byte)
                    }
                    None => {
                        match self.options.eof {
                            EofPolicy::Zero => self.tape.write(self.dp, 0),
                            EofPolicy::MaxValue => self.tape.write(self.dp, u8::MAX),
                            EofPolicy::Unchanged => {}
                        }
                        Action::ReadEof(self.tape.read(self.dp))
                    }
                }
            }
            Instruction::LoopOpen => return self.open_loop(next),
            Instruction::LoopClose => return self.close_loop(next),
            Instruction::Unknown(ch) => return Err(InterpreterError::InvalidCommand { ch, ip }),
            Instruction::End => unreachable!("sentinel is handled by the run loop"),
        };
        Ok((next, action))
    }

    fn open_loop(&mut self, next: Position) -> Result<(Position, Action), InterpreterError> {
        let ip = self.ip;
        match &mut self.loops {
            LoopState::Bookmark(bookmark) => {
                *bookmark = Some(ip);
                Ok((next, Action::Bookmarked(ip)))
            }
            LoopState::Stack(open) => {
                if self.tape.read(self.dp) == 0 {
                    let close = self
                        .program
                        .find_matching_close(ip)
                        .ok_or(InterpreterError::UnmatchedOpen { ip })?;
                    trace!(%ip, %close, "skipping loop body");
                    let (_, after) = self.program.next_instruction(close);
                    return Ok((after, Action::Skipped(close)));
                }
                open.push(ip);
                Ok((next, Action::Pushed(ip)))
            }
        }
    }

    fn close_loop(&mut self, next: Position) -> Result<(Position, Action), InterpreterError> {
        let ip = self.ip;
        let nonzero = self.tape.read(self.dp) > 0;
        let target = match &mut self.loops {
            LoopState::Bookmark(bookmark) => {
                let open = bookmark.ok_or(InterpreterError::InvalidLoopControl { ip })?;
                if !nonzero {
                    *bookmark = None;
                }
                open
            }
            LoopState::Stack(open) => {
                let top = *open.last().ok_or(InterpreterError::InvalidLoopControl { ip })?;
                if !nonzero {
                    open.pop();
                }
                top
            }
        };

        if nonzero {
            trace!(%ip, target = %target, "loop back");
            // Resume at the instruction after the remembered '['.
            let (_, body) = self.program.next_instruction(target);
            Ok((body, Action::JumpedBack(target)))
        } else {
            Ok((next, Action::Exited))
        }
    }
}

fn read_byte<R: Read>(input: &mut R) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Resource;

    fn run_program(code: &str, input: &[u8], options: Options) -> (Result<(), InterpreterError>, Vec<u8>) {
        let program = Program::build(code).unwrap();
        let mut out = Vec::new();
        let result = Interpreter::new(&program, options).run_with_io(input, &mut out);
        (result, out)
    }

    fn output_of(code: &str, input: &[u8]) -> Vec<u8> {
        let (result, out) = run_program(code, input, Options::default());
        result.unwrap();
        out
    }

    #[test]
    fn increments_emit_count_mod_256() {
        for n in 0usize..=255 {
            let code = format!("{}.", "+".repeat(n));
            assert_eq!(output_of(&code, b""), vec![n as u8], "n = {n}");
        }
    }

    #[test]
    fn wrapping_addition() {
        let code = format!("{}.", "+".repeat(256));
        assert_eq!(output_of(&code, b""), vec![0]);
    }

    #[test]
    fn wrapping_subtraction() {
        assert_eq!(output_of("-.", b""), vec![255]);
    }

    #[test]
    fn left_of_first_cell_is_a_no_op() {
        assert_eq!(output_of("<+.", b""), vec![1]);
    }

    #[test]
    fn right_of_last_cell_is_a_fresh_zero() {
        assert_eq!(output_of("+++>.<.", b""), vec![0, 3]);
    }

    #[test]
    fn clear_loop_runs_exactly_v_iterations() {
        for v in 1usize..=255 {
            let program = Program::build(&format!("{}[-]", "+".repeat(v))).unwrap();
            let mut bf = Interpreter::new(&program, Options::default());
            bf.run_with_io(io::empty(), io::sink()).unwrap();
            assert_eq!(bf.tape().read(bf.data_pointer()), 0);
            // v increments, '[' once, then v * ('-' ']')
            assert_eq!(bf.steps(), v + 1 + 2 * v, "v = {v}");
        }
    }

    #[test]
    fn clear_loop_in_stack_mode_covers_every_value() {
        let options = Options { loop_mode: LoopMode::Stack, ..Options::default() };
        for v in 0usize..=255 {
            let program = Program::build(&format!("{}[-]", "+".repeat(v))).unwrap();
            let mut bf = Interpreter::new(&program, options);
            bf.run_with_io(io::empty(), io::sink()).unwrap();
            assert_eq!(bf.tape().read(bf.data_pointer()), 0);
            // a zero cell skips the body in one step
            let expected = if v == 0 { 1 } else { v + 1 + 2 * v };
            assert_eq!(bf.steps(), expected, "v = {v}");
        }
    }

    #[test]
    fn clear_loop_on_zero_still_enters_body_once() {
        // The bookmark dialect never skips: '-' runs, wrapping to 255, then decays to 0.
        let program = Program::build("[-]").unwrap();
        let mut bf = Interpreter::new(&program, Options::default());
        bf.run_with_io(io::empty(), io::sink()).unwrap();
        assert_eq!(bf.tape().read(bf.data_pointer()), 0);
        assert_eq!(bf.steps(), 1 + 2 * 256);
    }

    #[test]
    fn echo_until_end_of_input() {
        assert_eq!(output_of(",[.,]", b"AB"), b"AB".to_vec());
    }

    #[test]
    fn echo_then_decay_to_zero() {
        let expected: Vec<u8> = (1..=b'A').rev().collect();
        assert_eq!(output_of(",[.-]", b"A"), expected);
    }

    #[test]
    fn eof_policies() {
        let zero = Options { eof: EofPolicy::Zero, ..Options::default() };
        let unchanged = Options { eof: EofPolicy::Unchanged, ..Options::default() };
        let max = Options { eof: EofPolicy::MaxValue, ..Options::default() };
        assert_eq!(run_program("+++,.", b"", zero).1, vec![0]);
        assert_eq!(run_program("+++,.", b"", unchanged).1, vec![3]);
        assert_eq!(run_program("+++,.", b"", max).1, vec![255]);
    }

    #[test]
    fn comments_do_not_change_behavior() {
        assert_eq!(output_of("hi+++.bye", b""), output_of("+++.", b""));
    }

    #[test]
    fn stray_close_is_invalid_loop_control_with_no_output() {
        let (result, out) = run_program("]", b"", Options::default());
        assert!(matches!(result, Err(InterpreterError::InvalidLoopControl { ip }) if ip == Position::new(0)));
        assert!(out.is_empty());
    }

    #[test]
    fn output_before_a_fault_is_kept() {
        let (result, out) = run_program("+.]", b"", Options::default());
        assert!(matches!(result, Err(InterpreterError::InvalidLoopControl { .. })));
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn unknown_instruction_is_invalid_command() {
        let program = Program::verbatim("+a+").unwrap();
        let result = Interpreter::new(&program, Options::default()).run_with_io(io::empty(), io::sink());
        assert!(matches!(
            result,
            Err(InterpreterError::InvalidCommand { ch: 'a', ip }) if ip == Position::new(1)
        ));
    }

    #[test]
    fn nested_loop_forgets_outer_bookmark() {
        let code = "++[>++[>+<-]<-]>>.";
        let (result, out) = run_program(code, b"", Options::default());
        assert!(matches!(result, Err(InterpreterError::InvalidLoopControl { ip }) if ip == Position::new(14)));
        assert!(out.is_empty());

        let stack = Options { loop_mode: LoopMode::Stack, ..Options::default() };
        let (result, out) = run_program(code, b"", stack);
        result.unwrap();
        assert_eq!(out, vec![4]);
    }

    #[test]
    fn zero_cell_loop_is_skipped_only_in_stack_mode() {
        assert_eq!(output_of("[.]", b""), vec![0]);
        let stack = Options { loop_mode: LoopMode::Stack, ..Options::default() };
        let (result, out) = run_program("[.]+.", b"", stack);
        result.unwrap();
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn stack_mode_reports_unmatched_open_when_skipping() {
        let stack = Options { loop_mode: LoopMode::Stack, ..Options::default() };
        let (result, _) = run_program("+>[", b"", stack);
        assert!(matches!(result, Err(InterpreterError::UnmatchedOpen { ip }) if ip == Position::new(2)));
    }

    #[test]
    fn stack_mode_hello_world() {
        let code = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
        let stack = Options { loop_mode: LoopMode::Stack, ..Options::default() };
        let (result, out) = run_program(code, b"", stack);
        result.unwrap();
        assert_eq!(out, b"Hello World!\n".to_vec());
    }

    #[test]
    fn growing_left_edge_gives_a_fresh_cell() {
        let grow = Options { left_edge: LeftEdge::Grow, ..Options::default() };
        let (result, out) = run_program("+<.>.", b"", grow);
        result.unwrap();
        assert_eq!(out, vec![0, 1]);
        // Clamped: '<' stays on the origin and '>' then appends a new zero cell.
        assert_eq!(output_of("+<.>.", b""), vec![1, 0]);
    }

    #[test]
    fn cell_limit_surfaces_as_resource_exhaustion() {
        let limited = Options { max_cells: Some(3), ..Options::default() };
        let (result, _) = run_program(">>>", b"", limited);
        assert!(matches!(
            result,
            Err(InterpreterError::ResourceExhausted { resource: Resource::Cells })
        ));
    }

    #[test]
    fn step_limit_aborts_infinite_loop() {
        let program = Program::build("+[]").unwrap();
        let control = StepControl::new(Some(1_000), Arc::new(AtomicBool::new(false)));
        let result = Interpreter::new(&program, Options::default()).run_with_control(io::empty(), io::sink(), &control);
        assert!(matches!(result, Err(InterpreterError::StepLimitExceeded { limit: 1_000 })));
    }

    #[test]
    fn step_limit_allows_programs_that_fit() {
        let program = Program::build("+++").unwrap();
        let control = StepControl::new(Some(3), Arc::new(AtomicBool::new(false)));
        let mut bf = Interpreter::new(&program, Options::default());
        assert!(bf.run_with_control(io::empty(), io::sink(), &control).is_ok());
        assert_eq!(bf.steps(), 3);
    }

    #[test]
    fn raised_cancel_flag_interrupts() {
        let program = Program::build("+[]").unwrap();
        let control = StepControl::new(None, Arc::new(AtomicBool::new(true)));
        let result = Interpreter::new(&program, Options::default()).run_with_control(io::empty(), io::sink(), &control);
        assert!(matches!(result, Err(InterpreterError::Interrupted)));
    }

    #[test]
    fn reruns_are_deterministic() {
        let program = Program::build(",[.,]+++[>++<-]>.").unwrap();
        let mut bf = Interpreter::new(&program, Options::default());
        let mut first = Vec::new();
        let mut second = Vec::new();
        bf.run_with_io(&b"xyz"[..], &mut first).unwrap();
        bf.run_with_io(&b"xyz"[..], &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(bf.tape().len(), 2);
    }

    #[test]
    fn debug_table_suppresses_output() {
        let program = Program::build(">+.").unwrap();
        let mut table = Vec::new();
        Interpreter::new(&program, Options::default()).run_debug(&mut table, None).unwrap();
        let table = String::from_utf8(table).unwrap();
        assert!(table.starts_with("STEP | IP"));
        assert!(table.contains("Moved pointer head to index 1"));
        assert!(table.contains("Increment cell[1] from 0 to 1"));
        assert!(table.contains("(suppressed in debug)"));
    }
}
