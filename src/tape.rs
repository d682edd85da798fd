//! The data tape.
//!
//! Cells live in an arena and are linked to their neighbours by index, so a [`CellId`] stays
//! valid for the tape's whole life no matter how the tape grows. The tape starts as a single
//! zero cell and grows on demand to the right. At the left end, [`LeftEdge`] decides whether
//! the pointer is clamped (the default) or a new cell is linked in.

use crate::error::{InterpreterError, Resource};

/// Behavior of `<` on the leftmost cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LeftEdge {
    /// Stay on the first cell.
    #[default]
    Clamp,
    /// Link a fresh zero cell to the left.
    Grow,
}

/// Stable handle to a cell in a [`Tape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(usize);

#[derive(Debug, Clone)]
struct Cell {
    value: u8,
    prev: Option<CellId>,
    next: Option<CellId>,
    // Logical coordinate; the origin cell is 0.
    index: isize,
}

impl Cell {
    fn zero(index: isize) -> Self {
        Cell { value: 0, prev: None, next: None, index }
    }
}

#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<Cell>,
    first: CellId,
    left_edge: LeftEdge,
    max_cells: Option<usize>,
}

impl Default for Tape {
    fn default() -> Self {
        Tape::new(LeftEdge::Clamp, None)
    }
}

impl Tape {
    /// A tape holding one zero cell. `max_cells` caps how many cells growth may create.
    pub fn new(left_edge: LeftEdge, max_cells: Option<usize>) -> Self {
        Tape {
            cells: vec![Cell::zero(0)],
            first: CellId(0),
            left_edge,
            max_cells,
        }
    }

    /// Handle to the cell the tape started with.
    pub fn origin(&self) -> CellId {
        CellId(0)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false: a tape has at least its origin cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Move one cell right, appending a zero cell first if `pos` is the rightmost.
    pub fn move_right(&mut self, pos: CellId) -> Result<CellId, InterpreterError> {
        if let Some(next) = self.cells[pos.0].next {
            return Ok(next);
        }
        let index = self.cells[pos.0].index + 1;
        let id = self.allocate(index)?;
        self.cells[id.0].prev = Some(pos);
        self.cells[pos.0].next = Some(id);
        tracing::trace!(cell = index, "tape grew right");
        Ok(id)
    }

    /// Move one cell left. On the first cell this either clamps or grows, per [`LeftEdge`].
    pub fn move_left(&mut self, pos: CellId) -> Result<CellId, InterpreterError> {
        if let Some(prev) = self.cells[pos.0].prev {
            return Ok(prev);
        }
        match self.left_edge {
            LeftEdge::Clamp => Ok(pos),
            LeftEdge::Grow => {
                let index = self.cells[pos.0].index - 1;
                let id = self.allocate(index)?;
                self.cells[id.0].next = Some(pos);
                self.cells[pos.0].prev = Some(id);
                self.first = id;
                tracing::trace!(cell = index, "tape grew left");
                Ok(id)
            }
        }
    }

    fn allocate(&mut self, index: isize) -> Result<CellId, InterpreterError> {
        let exhausted = InterpreterError::ResourceExhausted { resource: Resource::Cells };
        if self.max_cells.is_some_and(|max| self.cells.len() >= max) {
            return Err(exhausted);
        }
        self.cells.try_reserve(1).map_err(|_| exhausted)?;
        self.cells.push(Cell::zero(index));
        Ok(CellId(self.cells.len() - 1))
    }

    pub fn increment(&mut self, pos: CellId) {
        let cell = &mut self.cells[pos.0];
        cell.value = cell.value.wrapping_add(1);
    }

    pub fn decrement(&mut self, pos: CellId) {
        let cell = &mut self.cells[pos.0];
        cell.value = cell.value.wrapping_sub(1);
    }

    pub fn read(&self, pos: CellId) -> u8 {
        self.cells[pos.0].value
    }

    pub fn write(&mut self, pos: CellId, value: u8) {
        self.cells[pos.0].value = value;
    }

    /// Logical coordinate of a cell: 0 for the origin, negative left of it.
    pub fn index_of(&self, pos: CellId) -> isize {
        self.cells[pos.0].index
    }

    /// Cell values from leftmost to rightmost.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut values = Vec::with_capacity(self.cells.len());
        let mut cursor = Some(self.first);
        while let Some(id) = cursor {
            values.push(self.cells[id.0].value);
            cursor = self.cells[id.0].next;
        }
        values
    }
}
