//! __Cellgen__ runs generalized cellular automata.
//!
//! A [`CellSystem`] is a list of [`CellType`]s. Each cell type has a
//! weighted [`Neighbourhood`], an ordered list of [`Rule`]s and a default
//! transition. A rule fires when the weighted count of every cell type it
//! tests lies in the given [`Ranges`]; the first rule that fires decides the
//! next cell type.
//!
//! [Conway's Game of Life](https://conwaylife.com/wiki/Conway%27s_Game_of_Life)
//! is one of these cell systems:
//!
//! ```rust
//! use cellgen_lib::{CellSystem, GeneratorConfig, Grid};
//!
//! let glider: Grid = ".o...\n..o..\nooo..\n.....\n.....".parse()?;
//! let generator = GeneratorConfig::new().generator(CellSystem::conway(), glider.set_wrap(true))?;
//! generator.run(4)?;
//! assert_eq!(generator.generation(), 4);
//! assert_eq!(generator.grid().to_string(), ".....\n..o..\n...o.\n.ooo.\n.....\n");
//! # Ok::<(), cellgen_lib::Error>(())
//! ```
//!
//! Life-like and Generations rules can also be given as rule strings,
//! see the [`rules`] module.

mod config;
mod environment;
mod error;
mod generator;
mod grid;
mod neighbourhood;
mod range;
pub mod rules;
mod system;

pub use config::GeneratorConfig;
pub use environment::Environment;
pub use error::Error;
pub use generator::{Event, Generator, RunState};
pub use grid::Grid;
pub use neighbourhood::{Neighbourhood, WeightMatrix};
pub use range::{Range, Ranges};
pub use system::{CellSystem, CellType, Condition, Rule};
