//! Evaluation of the cell system on a single cell.

use crate::{error::Error, grid::Grid, system::CellSystem};
use educe::Educe;
use std::sync::Arc;

/// The nonzero weights of a neighbourhood, as offsets from the center.
#[derive(Clone, Debug, Default)]
struct Kernel {
    radius: i32,
    entries: Box<[(isize, isize, i64)]>,
}

/// Everything an [`Environment`] precomputes from a cell system.
#[derive(Debug)]
struct Tables {
    system: CellSystem,
    /// One kernel for each cell type.
    kernels: Vec<Kernel>,
    computation_factor: usize,
}

/// Computes the next cell type of single cells of a grid.
///
/// The weight tables are computed once from the cell system and shared
/// between all copies. Each copy has its own scratch counters, so copies
/// can be used in parallel.
#[derive(Educe)]
#[educe(Debug)]
pub struct Environment {
    tables: Arc<Tables>,
    grid: Grid,
    /// Weighted neighbour counts, indexed by cell type.
    ///
    /// `counters[0]` is the total weight of all neighbours
    /// which are not of cell type `0`.
    #[educe(Debug(ignore))]
    counters: Vec<i64>,
}

impl Environment {
    /// Creates a new environment for the given cell system and grid.
    ///
    /// Fails if the cell system is invalid, or if the grid contains
    /// a cell of a nonexistent cell type.
    pub fn new(system: &CellSystem, grid: Grid) -> Result<Self, Error> {
        system.validate()?;
        let mut kernels = Vec::with_capacity(system.cell_type_count());
        let mut max_radius = 1;
        for id in 0..system.cell_type_count() {
            let nbhd = system
                .resolve_neighbourhood(id)
                .ok_or(Error::MissingNeighbourhood(id))?;
            let matrix = nbhd.weights_array();
            let radius = matrix.radius();
            let side = matrix.side();
            let mut entries = Vec::new();
            for y in 0..side {
                for x in 0..side {
                    let weight = matrix.get(x, y);
                    if weight != 0 {
                        let dx = x as isize - radius as isize;
                        let dy = y as isize - radius as isize;
                        entries.push((dx, dy, weight as i64));
                    }
                }
            }
            max_radius = max_radius.max(radius);
            kernels.push(Kernel {
                radius,
                entries: entries.into_boxed_slice(),
            });
        }
        let side = (2 * max_radius + 1) as usize;
        let tables = Arc::new(Tables {
            system: system.clone(),
            kernels,
            computation_factor: side * side,
        });
        Self::with_tables(tables, grid)
    }

    fn with_tables(tables: Arc<Tables>, grid: Grid) -> Result<Self, Error> {
        let count = tables.system.cell_type_count();
        if let Some(pos) = grid.cells().iter().position(|&c| c as usize >= count) {
            let (x, y) = (pos % grid.width(), pos / grid.width());
            return Err(Error::InvalidCellType(x, y, grid.cells()[pos] as usize));
        }
        Ok(Environment {
            counters: vec![0; count],
            tables,
            grid,
        })
    }

    /// A copy sharing the weight tables and the grid, with fresh counters.
    pub fn copy(&self) -> Self {
        Environment {
            tables: Arc::clone(&self.tables),
            grid: self.grid.clone(),
            counters: vec![0; self.counters.len()],
        }
    }

    /// A copy sharing the weight tables, bound to another grid.
    ///
    /// Fails if the grid contains a cell of a nonexistent cell type.
    pub fn rebind(&self, grid: Grid) -> Result<Self, Error> {
        Self::with_tables(Arc::clone(&self.tables), grid)
    }

    /// Binds to a grid computed by an environment with the same tables,
    /// which only contains valid cell types.
    pub(crate) fn rebind_unchecked(&self, grid: Grid) -> Self {
        Environment {
            tables: Arc::clone(&self.tables),
            grid,
            counters: vec![0; self.counters.len()],
        }
    }

    /// The cell system.
    pub fn system(&self) -> &CellSystem {
        &self.tables.system
    }

    /// The grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The radius of the neighbourhood of a cell type.
    pub fn radius(&self, cell_type: usize) -> Option<i32> {
        self.tables.kernels.get(cell_type).map(|kernel| kernel.radius)
    }

    /// The cost of computing one cell, relative to a kernel of a single cell.
    ///
    /// This is `(2r + 1)²` for the largest radius `r` of all neighbourhoods.
    pub fn computation_factor(&self) -> usize {
        self.tables.computation_factor
    }

    /// Computes the next cell type of the cell at `(x0, y0)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x0, y0)` is outside of the grid.
    pub fn compute_next_cell_type(&mut self, x0: usize, y0: usize) -> u8 {
        let grid = &self.grid;
        let (width, height) = (grid.width(), grid.height());
        let cells = grid.cells();
        let id = cells[x0 + y0 * width] as usize;
        let cell_type = &self.tables.system.cell_types()[id];
        if cell_type.rules.is_empty() {
            return cell_type.default_cell_type as u8;
        }

        let counters = &mut self.counters;
        counters.iter_mut().for_each(|c| *c = 0);
        for &(dx, dy, weight) in self.tables.kernels[id].entries.iter() {
            let mut x = x0 as isize + dx;
            let mut y = y0 as isize + dy;
            if grid.is_wrapping() {
                x = x.rem_euclid(width as isize);
                y = y.rem_euclid(height as isize);
            } else if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
                continue;
            }
            let neighbour = cells[x as usize + y as usize * width] as usize;
            if neighbour == 0 {
                continue;
            }
            counters[0] += weight;
            counters[neighbour] += weight;
        }

        for rule in &cell_type.rules {
            if rule
                .conditions
                .iter()
                .all(|condition| condition.ranges.contains(counters[condition.cell_type]))
            {
                return rule.target_cell_type as u8;
            }
        }
        cell_type.default_cell_type as u8
    }

    /// Computes the next cell types of a rectangle of cells whose upper left
    /// corner is `(x0, y0)`. `rows[j][i]` receives the cell `(x0 + i, y0 + j)`.
    pub(crate) fn compute_rows(&mut self, x0: usize, y0: usize, rows: &mut [&mut [u8]]) {
        for (j, row) in rows.iter_mut().enumerate() {
            for (i, cell) in row.iter_mut().enumerate() {
                *cell = self.compute_next_cell_type(x0 + i, y0 + j);
            }
        }
    }

    /// Computes the whole next generation serially.
    pub fn next_grid(&mut self) -> Grid {
        let (width, height) = (self.grid.width(), self.grid.height());
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(self.compute_next_cell_type(x, y));
            }
        }
        Grid::from_parts(width, height, self.grid.is_wrapping(), cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        neighbourhood::Neighbourhood,
        system::{CellSystem, Rule},
    };

    fn ranges(s: &str) -> crate::range::Ranges {
        s.parse().unwrap()
    }

    #[test]
    fn blinker() -> Result<(), Error> {
        let grid: Grid = ".....\n..o..\n..o..\n..o..\n.....".parse()?;
        let mut env = Environment::new(&CellSystem::conway(), grid)?;
        assert_eq!(env.compute_next_cell_type(1, 2), 1);
        assert_eq!(env.compute_next_cell_type(2, 1), 0);
        assert_eq!(env.compute_next_cell_type(2, 2), 1);
        assert_eq!(
            env.next_grid().to_string(),
            ".....\n.....\n.ooo.\n.....\n.....\n"
        );
        Ok(())
    }

    #[test]
    fn wrap_around() -> Result<(), Error> {
        let grid: Grid = "o...\no...\no...".parse()?;
        let mut env = Environment::new(&CellSystem::conway(), grid.clone())?;
        assert_eq!(env.compute_next_cell_type(3, 1), 0);

        let mut env = env.rebind(grid.set_wrap(true))?;
        assert_eq!(env.compute_next_cell_type(3, 1), 1);
        Ok(())
    }

    #[test]
    fn background_is_not_counted() -> Result<(), Error> {
        // Cell type 1 becomes 2 when it has at least one neighbour at all.
        let mut system = CellSystem::new(Neighbourhood::moore());
        system.push_cell_type()?;
        system
            .push_cell_type()?
            .set_default_cell_type(1)
            .push_rule(Rule::new(2).with_condition(0, ranges("1-")));
        system.push_cell_type()?.set_default_cell_type(2);

        let grid: Grid = "...\n.o.\n...".parse()?;
        let mut env = Environment::new(&system, grid)?;
        assert_eq!(env.compute_next_cell_type(1, 1), 1);

        let grid: Grid = "A..\n.o.\n...".parse()?;
        let mut env = env.rebind(grid)?;
        assert_eq!(env.compute_next_cell_type(1, 1), 2);
        Ok(())
    }

    #[test]
    fn weights_and_rule_order() -> Result<(), Error> {
        // Weight 3 to the left, -1 to the right.
        let mut nbhd = Neighbourhood::with_radius(1)?;
        nbhd.set_weight_at(-1, 0, 3)?;
        nbhd.set_weight_at(1, 0, -1)?;
        let mut system = CellSystem::new(nbhd);
        system
            .push_cell_type()?
            .push_rule(Rule::new(1).with_condition(1, ranges("3")))
            .push_rule(Rule::new(2).with_condition(1, ranges("2-")));
        system.push_cell_type()?;
        system.push_cell_type()?;

        let mut env = Environment::new(&system, "o.o\no..\n..o".parse()?)?;
        // 3 - 1 = 2: the first rule does not fire, the second does.
        assert_eq!(env.compute_next_cell_type(1, 0), 2);
        // Only the left neighbour.
        assert_eq!(env.compute_next_cell_type(1, 1), 1);
        // Only the right neighbour: -1 is in no range.
        assert_eq!(env.compute_next_cell_type(1, 2), 0);
        assert_eq!(env.computation_factor(), 9);
        Ok(())
    }

    #[test]
    fn no_rules_short_circuit() -> Result<(), Error> {
        let mut system = CellSystem::new(Neighbourhood::moore());
        system.push_cell_type()?.set_default_cell_type(1);
        system.push_cell_type()?;
        let mut env = Environment::new(&system, Grid::new(2, 2))?;
        assert_eq!(env.next_grid().cells(), &[1, 1, 1, 1]);
        Ok(())
    }

    #[test]
    fn computation_factor() -> Result<(), Error> {
        let mut system = CellSystem::conway();
        system
            .cell_type_mut(1)
            .unwrap()
            .set_neighbourhood(Neighbourhood::von_neumann(3)?);
        let env = Environment::new(&system, Grid::new(1, 1))?;
        assert_eq!(env.computation_factor(), 49);
        assert_eq!(env.radius(0), Some(1));
        assert_eq!(env.radius(1), Some(3));
        assert_eq!(env.copy().computation_factor(), 49);
        Ok(())
    }

    #[test]
    fn next_grid_keeps_shape() -> Result<(), Error> {
        let grid: Grid = "o..\no..\no..\n...".parse()?;
        let mut env = Environment::new(&CellSystem::conway(), grid.clone())?;
        let next = env.next_grid();
        assert_eq!(next.to_string(), "...\noo.\n...\n...\n");
        assert!(!next.is_wrapping());
        assert!(!next.shares_storage(&grid));

        let next = env.rebind(grid.set_wrap(true))?.next_grid();
        assert_eq!(next.to_string(), "...\nooo\n...\n...\n");
        assert!(next.is_wrapping());
        Ok(())
    }

    #[test]
    fn invalid_grid() {
        let grid: Grid = "..\n.A".parse().unwrap();
        assert_eq!(
            Environment::new(&CellSystem::conway(), grid).err(),
            Some(Error::InvalidCellType(1, 1, 2))
        );
        assert_eq!(
            Environment::new(&CellSystem::new(None), Grid::new(1, 1)).err(),
            Some(Error::NoCellTypes)
        );
    }
}
