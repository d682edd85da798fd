//! The instruction stream.
//!
//! A [`Program`] is an immutable, index-addressed sequence of [`Instruction`]s that always
//! ends in exactly one [`Instruction::End`]. Bracket balance is never checked here; loops are
//! resolved lazily by the engine as they are reached.

use std::fmt;

use crate::error::{InterpreterError, Resource};

/// One opcode of the language, plus the end-of-program sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MoveRight,  // >
    MoveLeft,   // <
    Increment,  // +
    Decrement,  // -
    Output,     // .
    Input,      // ,
    LoopOpen,   // [
    LoopClose,  // ]
    /// Only produced by [`Program::verbatim`]; rejected by the engine when reached.
    Unknown(char),
    End,
}

impl Instruction {
    /// Decode a source character. Anything outside `><+-.,[]` is a comment.
    pub fn from_symbol(ch: char) -> Option<Instruction> {
        Some(match ch {
            '>' => Instruction::MoveRight,
            '<' => Instruction::MoveLeft,
            '+' => Instruction::Increment,
            '-' => Instruction::Decrement,
            '.' => Instruction::Output,
            ',' => Instruction::Input,
            '[' => Instruction::LoopOpen,
            ']' => Instruction::LoopClose,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            Instruction::MoveRight => '>',
            Instruction::MoveLeft => '<',
            Instruction::Increment => '+',
            Instruction::Decrement => '-',
            Instruction::Output => '.',
            Instruction::Input => ',',
            Instruction::LoopOpen => '[',
            Instruction::LoopClose => ']',
            Instruction::Unknown(ch) => ch,
            Instruction::End => '!',
        }
    }
}

/// A stable index into a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position(usize);

impl Position {
    pub const fn new(index: usize) -> Self {
        Position(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    fn next(self) -> Self {
        Position(self.0 + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Delegate so width and alignment flags apply.
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    // Char offset of each instruction in the source text; parallel to `instructions`.
    offsets: Vec<usize>,
}

impl Program {
    /// Build a program from source text, silently dropping every comment character.
    pub fn build(source: &str) -> Result<Self, InterpreterError> {
        Self::scan(source, Instruction::from_symbol)
    }

    /// Build a program that keeps every non-whitespace character. Characters outside the
    /// instruction alphabet are stored as [`Instruction::Unknown`] and fail when executed.
    pub fn verbatim(source: &str) -> Result<Self, InterpreterError> {
        Self::scan(source, |ch| {
            if ch.is_whitespace() {
                None
            } else {
                Some(Instruction::from_symbol(ch).unwrap_or(Instruction::Unknown(ch)))
            }
        })
    }

    fn scan<F>(source: &str, decode: F) -> Result<Self, InterpreterError>
    where
        F: Fn(char) -> Option<Instruction>,
    {
        let mut program = Program { instructions: Vec::new(), offsets: Vec::new() };
        let mut char_count = 0usize;
        for (offset, ch) in source.chars().enumerate() {
            char_count = offset + 1;
            if let Some(instruction) = decode(ch) {
                program.push(instruction, offset)?;
            }
        }
        program.push(Instruction::End, char_count)?;
        Ok(program)
    }

    fn push(&mut self, instruction: Instruction, offset: usize) -> Result<(), InterpreterError> {
        let exhausted = |_| InterpreterError::ResourceExhausted { resource: Resource::Instructions };
        self.instructions.try_reserve(1).map_err(exhausted)?;
        self.offsets.try_reserve(1).map_err(exhausted)?;
        self.instructions.push(instruction);
        self.offsets.push(offset);
        Ok(())
    }

    /// Position of the first instruction (the sentinel, for an empty program).
    pub fn start(&self) -> Position {
        Position(0)
    }

    /// The instruction at `pos` and the position immediately after it.
    ///
    /// Positions past the sentinel read as [`Instruction::End`].
    pub fn next_instruction(&self, pos: Position) -> (Instruction, Position) {
        let instruction = self.instructions.get(pos.0).copied().unwrap_or(Instruction::End);
        (instruction, pos.next())
    }

    /// Number of stored instructions, sentinel included.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when the program holds nothing but the sentinel.
    pub fn is_empty(&self) -> bool {
        self.instructions.len() <= 1
    }

    /// Char offset in the original source of the instruction at `pos`.
    pub fn source_offset(&self, pos: Position) -> usize {
        match self.offsets.get(pos.0) {
            Some(&offset) => offset,
            None => self.offsets.last().copied().unwrap_or(0),
        }
    }

    /// Scan forward from the `[` at `open` for the `]` that balances it.
    pub fn find_matching_close(&self, open: Position) -> Option<Position> {
        let mut depth = 0usize;
        for (index, instruction) in self.instructions.iter().enumerate().skip(open.0) {
            match instruction {
                Instruction::LoopOpen => depth += 1,
                Instruction::LoopClose => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(Position(index));
                    }
                }
                Instruction::End => return None,
                _ => {}
            }
        }
        None
    }

    pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.instructions.iter().copied()
    }
}

impl fmt::Display for Program {
    /// Renders the instructions without the sentinel.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in self.instructions() {
            if instruction != Instruction::End {
                write!(f, "{}", instruction.symbol())?;
            }
        }
        Ok(())
    }
}
