//! The grid of cells.

use crate::error::Error;
use rand::Rng;
use std::{
    fmt::{self, Display, Formatter, Write},
    str::FromStr,
    sync::Arc,
};

/// A rectangular grid of cells, each holding the id of its cell type.
///
/// Cells are stored row by row. Cloning a grid is cheap: the clones share
/// their storage until one of them is modified.
///
/// A grid may wrap around, in which case it is a torus: the left neighbour
/// of a cell in the first column is in the last column, and so on.
/// Otherwise, neighbours outside of the grid are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Grid {
    width: usize,
    height: usize,
    wrap: bool,
    cells: Arc<Vec<u8>>,
}

impl Grid {
    /// Creates a new grid where every cell has cell type `0`.
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            wrap: false,
            cells: Arc::new(vec![0; width * height]),
        }
    }

    /// Creates a grid from its cells, row by row.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, Error> {
        if cells.len() != width * height {
            return Err(Error::DimensionMismatch(cells.len(), width, height));
        }
        Ok(Grid {
            width,
            height,
            wrap: false,
            cells: Arc::new(cells),
        })
    }

    /// Creates a grid from cells whose length is already known to be
    /// `width * height`.
    pub(crate) fn from_parts(width: usize, height: usize, wrap: bool, cells: Vec<u8>) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Grid {
            width,
            height,
            wrap,
            cells: Arc::new(cells),
        }
    }

    /// Creates a random grid.
    ///
    /// Each cell is of cell type `0` with probability `1 - density`,
    /// and of one of the cell types `1..cell_type_count` otherwise.
    pub fn random<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        density: f64,
        cell_type_count: usize,
        rng: &mut R,
    ) -> Self {
        let density = if density.is_nan() {
            0.0
        } else {
            density.clamp(0.0, 1.0)
        };
        let max = cell_type_count.clamp(1, u8::MAX as usize + 1);
        let cells = (0..width * height)
            .map(|_| {
                if max > 1 && rng.gen_bool(density) {
                    rng.gen_range(1..max) as u8
                } else {
                    0
                }
            })
            .collect();
        Grid {
            width,
            height,
            wrap: false,
            cells: Arc::new(cells),
        }
    }

    /// Sets whether the grid wraps around.
    pub fn set_wrap(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    /// Width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the grid wraps around.
    pub fn is_wrapping(&self) -> bool {
        self.wrap
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells, row by row.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// The cell type of the cell at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.cells[x + y * self.width])
        } else {
            None
        }
    }

    /// Sets the cell type of the cell at `(x, y)`.
    ///
    /// The storage is copied first if it is shared with another grid.
    pub fn set(&mut self, x: usize, y: usize, cell_type: u8) -> Result<(), Error> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfGrid(x, y));
        }
        Arc::make_mut(&mut self.cells)[x + y * self.width] = cell_type;
        Ok(())
    }

    /// A row of cells.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        if y < self.height {
            Some(&self.cells[y * self.width..(y + 1) * self.width])
        } else {
            None
        }
    }

    /// Number of cells of each cell type, indexed by cell type.
    pub fn census(&self) -> Vec<usize> {
        let mut count = Vec::new();
        for &cell in self.cells.iter() {
            let cell = cell as usize;
            if count.len() <= cell {
                count.resize(cell + 1, 0);
            }
            count[cell] += 1;
        }
        count
    }

    /// Whether two grids share their storage.
    pub fn shares_storage(&self, other: &Grid) -> bool {
        Arc::ptr_eq(&self.cells, &other.cells)
    }
}

/// Displays the grid in [Plaintext](https://conwaylife.com/wiki/Plaintext) format.
///
/// * Cell type `0` is represented by `.`;
/// * Cell type `1` is represented by `o`;
/// * Cell types `2` to `27` are represented by uppercase letters starting from `A`;
/// * Other cell types are represented by `#`.
impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for &cell in &self.cells[y * self.width..(y + 1) * self.width] {
                f.write_char(match cell {
                    0 => '.',
                    1 => 'o',
                    2..=27 => (b'A' + cell - 2) as char,
                    _ => '#',
                })?;
            }
            f.write_char('\n')?;
        }
        Ok(())
    }
}

/// Parses a grid in the format of its [`Display`] implementation.
///
/// Lines starting with `!` are comments. Short lines are padded with
/// cell type `0`. The resulting grid does not wrap around.
impl FromStr for Grid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<&str> = s
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.starts_with('!'))
            .collect();
        let width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        let mut cells = Vec::with_capacity(width * lines.len());
        for line in &lines {
            for c in line.chars() {
                cells.push(match c {
                    '.' | 'b' => 0,
                    'o' | '*' => 1,
                    'A'..='Z' => c as u8 - b'A' + 2,
                    _ => return Err(Error::InvalidGridChar(c)),
                });
            }
            cells.resize(cells.len() + width - line.chars().count(), 0);
        }
        Grid::from_cells(width, lines.len(), cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn plaintext() -> Result<(), Error> {
        let grid: Grid = "! a glider\n.o.\n..o\nooo\n".parse()?;
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.get(1, 0), Some(1));
        assert_eq!(grid.get(0, 1), Some(0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.to_string(), ".o.\n..o\nooo\n");

        let grid: Grid = "oA\n.\nZ".parse()?;
        assert_eq!(grid.cells(), &[1, 2, 0, 0, 27, 0]);
        assert_eq!("o?".parse::<Grid>(), Err(Error::InvalidGridChar('?')));
        Ok(())
    }

    #[test]
    fn copy_on_write() -> Result<(), Error> {
        let mut grid = Grid::new(4, 3);
        let snapshot = grid.clone();
        assert!(grid.shares_storage(&snapshot));
        grid.set(3, 2, 5)?;
        assert!(!grid.shares_storage(&snapshot));
        assert_eq!(grid.get(3, 2), Some(5));
        assert_eq!(snapshot.get(3, 2), Some(0));
        assert_eq!(grid.set(4, 0, 1), Err(Error::OutOfGrid(4, 0)));
        Ok(())
    }

    #[test]
    fn dimensions() -> Result<(), Error> {
        assert_eq!(
            Grid::from_cells(3, 2, vec![0; 5]),
            Err(Error::DimensionMismatch(5, 3, 2))
        );
        let grid = Grid::from_cells(3, 2, vec![0, 1, 2, 3, 4, 5])?;
        assert_eq!(grid.row(1), Some(&[3, 4, 5][..]));
        assert_eq!(grid.row(2), None);
        assert_eq!(grid.len(), 6);
        assert!(Grid::new(0, 5).is_empty());
        Ok(())
    }

    #[test]
    fn random() {
        let mut rng = StdRng::seed_from_u64(42);
        let grid = Grid::random(30, 20, 0.5, 3, &mut rng);
        assert_eq!(grid.len(), 600);
        assert!(grid.cells().iter().all(|&c| c < 3));
        let census = grid.census();
        assert!(census[0] > 0 && census[1] > 0 && census[2] > 0);

        let empty = Grid::random(10, 10, 1.0, 1, &mut rng);
        assert_eq!(empty.census(), vec![100]);
    }
}
