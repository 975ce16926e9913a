//! Grid layout with natural word wrap.
//!
//! Encoded words are placed left to right, top to bottom. Words on the same
//! line are separated by one blank cell, a word that does not fit the rest
//! of the line starts a fresh line, and a word longer than a whole line is
//! split cell by cell at the line boundary.

use serde::{Serialize, Serializer};

/// Number of rows in every candidate grid.
pub const ROWS: usize = 7;

/// Grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSize {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
}

impl GridSize {
    /// 7×7, capacity 49. Always attempted first.
    pub const SQUARE: Self = Self { rows: ROWS, cols: 7 };

    /// 7×8, capacity 56. The only fallback; nothing larger is tried.
    pub const WIDE: Self = Self { rows: ROWS, cols: 8 };

    /// Candidate sizes in the order they are attempted.
    pub const CANDIDATES: [Self; 2] = [Self::SQUARE, Self::WIDE];

    /// Total number of cells.
    #[must_use]
    pub const fn capacity(self) -> usize {
        self.rows * self.cols
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    /// Unused cell or inter-word gap
    #[default]
    Blank,
    /// Encoded character
    Symbol(char),
}

impl Cell {
    /// Display form: the symbol itself, or a space for blanks.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Blank => ' ',
            Self::Symbol(c) => c,
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

/// Fixed-size matrix of cells.
///
/// Serializes as an array of rows, each an array of one-character strings
/// where blanks are `" "`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: GridSize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// Creates an all-blank grid.
    #[must_use]
    pub fn blank(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![vec![Cell::Blank; size.cols]; size.rows],
        }
    }

    /// Grid dimensions.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Rows of cells, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    /// Number of cells holding a symbol.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| matches!(c, Cell::Symbol(_)))
            .count()
    }

    /// Renders rows joined by newlines, cells joined by single spaces.
    #[must_use]
    pub fn render(&self) -> String {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.as_char().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.cells)
    }
}

/// A successful layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Filled grid
    pub grid: Grid,
    /// Cells consumed: encoded characters plus inter-word gaps
    pub cells_used: usize,
    /// Inter-word gap cells inserted
    pub gaps: usize,
}

/// Layout failed: the words need more cells than the grid has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// Grid that was attempted
    pub size: GridSize,
    /// Cells placed before running out of room
    pub cells_used: usize,
}

/// Write cursor over a grid.
struct Cursor {
    grid: Grid,
    row: usize,
    col: usize,
    used: usize,
}

impl Cursor {
    fn put(&mut self, cell: Cell) -> bool {
        if self.row >= self.grid.size.rows {
            return false;
        }
        self.grid.cells[self.row][self.col] = cell;
        self.col += 1;
        self.used += 1;
        if self.col >= self.grid.size.cols {
            self.row += 1;
            self.col = 0;
        }
        true
    }

    const fn new_line(&mut self) {
        self.row += 1;
        self.col = 0;
    }
}

/// Lays encoded words into a grid of the given size.
///
/// # Errors
///
/// Returns [`Overflow`] when the words need more than `size.capacity()`
/// cells, counting gaps and cells skipped by wrapping.
pub fn layout(words: &[Vec<char>], size: GridSize) -> Result<Placement, Overflow> {
    let mut cursor = Cursor {
        grid: Grid::blank(size),
        row: 0,
        col: 0,
        used: 0,
    };
    let mut gaps = 0;
    let overflow = |cursor: &Cursor| Overflow {
        size,
        cells_used: cursor.used,
    };

    for word in words.iter().filter(|w| !w.is_empty()) {
        if cursor.col != 0 {
            if !cursor.put(Cell::Blank) {
                return Err(overflow(&cursor));
            }
            gaps += 1;
        }

        if cursor.col != 0 && size.cols - cursor.col < word.len() {
            cursor.new_line();
        }

        for &symbol in word {
            if !cursor.put(Cell::Symbol(symbol)) {
                return Err(overflow(&cursor));
            }
        }
    }

    Ok(Placement {
        cells_used: cursor.used,
        grid: cursor.grid,
        gaps,
    })
}

/// Lays words into the first candidate size that fits: 7×7, then 7×8.
///
/// # Errors
///
/// Returns the 7×8 [`Overflow`] when neither size fits.
pub fn best_fit(words: &[Vec<char>]) -> Result<Placement, Overflow> {
    let mut last = None;
    for size in GridSize::CANDIDATES {
        match layout(words, size) {
            Ok(placed) => return Ok(placed),
            Err(overflow) => last = Some(overflow),
        }
    }
    Err(last.unwrap_or(Overflow {
        size: GridSize::WIDE,
        cells_used: 0,
    }))
}
