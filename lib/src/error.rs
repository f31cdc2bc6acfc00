//! All kinds of errors in this crate.

use crate::generator::RunState;
use ca_rules::ParseRuleError;
use displaydoc::Display;
use thiserror::Error;

/// All kinds of errors in this crate.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
pub enum Error {
    /// Invalid range with lower bound {0} and upper bound {1}.
    InvalidRange(i64, i64),
    /// At least one range is required.
    EmptyRanges,
    /// Unparsable range: {0:?}.
    UnparsableRange(String),
    /// Invalid position ({0}, {1}) for radius {2}.
    OutOfRangeCoordinate(i32, i32, i32),
    /// Invalid radius: {0}.
    InvalidRadius(i64),
    /// {0} weights do not form a square kernel with a valid radius.
    InvalidWeights(usize),
    /// Grid data of size {0} does not match the dimensions {1}x{2}.
    DimensionMismatch(usize, usize, usize),
    /// Cell ({0}, {1}) is outside the grid.
    OutOfGrid(usize, usize),
    /// Invalid character in grid: {0:?}.
    InvalidGridChar(char),
    /// Cell at ({0}, {1}) has invalid cell type: {2}.
    InvalidCellType(usize, usize, usize),
    /// No cell type with id {0}.
    NoSuchCellType(usize),
    /// Cell type {0} refers to the nonexistent cell type {1}.
    DanglingCellType(usize, usize),
    /// Cell type {0} has no neighbourhood, and the cell system has none either.
    MissingNeighbourhood(usize),
    /// A cell system can have at most 255 cell types.
    TooManyCellTypes,
    /// A cell system needs at least one cell type.
    NoCellTypes,
    /// Invalid rule: {0:?}.
    ParseRuleError(#[from] ParseRuleError),
    /// The generator is {0:?}, but the operation requires it to be {1:?}.
    IllegalState(RunState, RunState),
    /// A worker panicked while computing generation {0}.
    WorkerPanicked(u64),
    /// The coordinator thread is gone.
    CoordinatorGone,
    /// Unable to start a thread: {0}.
    Thread(String),
}
