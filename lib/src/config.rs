//! Generator configuration.

use crate::{error::Error, generator::Generator, grid::Grid, system::CellSystem};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Generator configuration.
///
/// The generator will be created from this configuration,
/// a cell system and an initial grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(default, rename_all = "kebab-case")
)]
pub struct GeneratorConfig {
    /// Number of worker threads.
    ///
    /// `None` means one thread for each logical CPU.
    pub threads: Option<usize>,

    /// A rectangle of `w × h` cells is computed by a single task when
    /// `w · h · f` does not exceed this threshold, where `f` is the
    /// [computation factor](crate::Environment::computation_factor).
    /// Otherwise it is split into four.
    ///
    /// `10_000_000` by default.
    pub split_threshold: u64,

    /// Minimal time between two generations while playing, in milliseconds.
    ///
    /// Only the absolute value matters. `0` by default.
    pub speed: i64,
}

impl GeneratorConfig {
    /// The default split threshold.
    pub const DEFAULT_SPLIT_THRESHOLD: u64 = 10_000_000;

    /// Sets up a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    pub fn set_threads<T: Into<Option<usize>>>(mut self, threads: T) -> Self {
        self.threads = threads.into();
        self
    }

    /// Sets the split threshold.
    pub fn set_split_threshold(mut self, split_threshold: u64) -> Self {
        self.split_threshold = split_threshold;
        self
    }

    /// Sets the speed, in milliseconds.
    pub fn set_speed(mut self, speed: i64) -> Self {
        self.speed = speed;
        self
    }

    /// Creates a new generator from the configuration.
    pub fn generator(&self, system: CellSystem, grid: Grid) -> Result<Generator, Error> {
        Generator::new(system, grid, self)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            threads: None,
            split_threshold: Self::DEFAULT_SPLIT_THRESHOLD,
            speed: 0,
        }
    }
}
