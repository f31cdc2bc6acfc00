//! Cell systems built from rule strings.
//!
//! Supports [totalistic Life-like rules](https://conwaylife.com/wiki/Totalistic_Life-like_cellular_automaton)
//! such as `B3/S23`, and their [Generations](https://conwaylife.com/wiki/Generations)
//! counterparts such as `B2/S/C3`, in every notation that
//! [`ca-rules`](https://crates.io/crates/ca-rules) understands.
//!
//! Cell type `0` is dead, cell type `1` is alive, and cell types `2..n`
//! are the dying states of a Generations rule. Only living cells are
//! counted as neighbours.

use crate::{
    error::Error,
    neighbourhood::Neighbourhood,
    range::{Range, Ranges},
    system::{CellSystem, Rule},
};
use ca_rules::{ParseLife, ParseLifeGen};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A totalistic Life-like or Generations rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LifeLike {
    /// Neighbour counts for a birth.
    birth: Vec<u8>,
    /// Neighbour counts for survival.
    survival: Vec<u8>,
    /// Number of states. `2` for a non-Generations rule.
    gen: usize,
}

impl LifeLike {
    /// Constructs a new rule from the `b` and `s` data.
    pub fn new(b: Vec<u8>, s: Vec<u8>) -> Self {
        Self::new_gen(b, s, 2)
    }

    /// Constructs a new Generations rule from the `b` and `s` data
    /// and the number of states.
    pub fn with_generations(b: Vec<u8>, s: Vec<u8>, gen: usize) -> Result<Self, Error> {
        if gen > CellSystem::MAX_CELL_TYPES {
            return Err(Error::TooManyCellTypes);
        }
        Ok(Self::new_gen(b, s, gen))
    }

    fn new_gen(mut b: Vec<u8>, mut s: Vec<u8>, gen: usize) -> Self {
        b.sort_unstable();
        b.dedup();
        s.sort_unstable();
        s.dedup();
        LifeLike {
            birth: b,
            survival: s,
            gen: gen.max(2),
        }
    }

    /// Neighbour counts for a birth.
    pub fn birth(&self) -> &[u8] {
        &self.birth
    }

    /// Neighbour counts for survival.
    pub fn survival(&self) -> &[u8] {
        &self.survival
    }

    /// Number of states.
    pub fn gen(&self) -> usize {
        self.gen
    }

    /// Builds the cell system.
    ///
    /// A rule constructed through [`ParseLifeGen::from_bsg`] with more than
    /// [`CellSystem::MAX_CELL_TYPES`] states gets truncated to that many.
    pub fn cell_system(&self) -> CellSystem {
        let gen = self.gen.min(CellSystem::MAX_CELL_TYPES);
        let mut system = CellSystem::new(Neighbourhood::moore()).set_name(self);

        for _ in 0..gen {
            if system.push_cell_type().is_err() {
                break;
            }
        }

        for cell_type in 0..gen {
            let (name, default, counts) = match cell_type {
                0 => ("dead", 0, &self.birth[..]),
                1 => ("alive", if gen > 2 { 2 } else { 0 }, &self.survival[..]),
                _ => ("dying", (cell_type + 1) % gen, &[][..]),
            };
            if let Some(cell_type) = system.cell_type_mut(cell_type) {
                cell_type.set_name(name).set_default_cell_type(default);
                if let Some(ranges) = count_ranges(counts) {
                    cell_type.push_rule(Rule::new(1).with_condition(1, ranges));
                }
            }
        }
        system
    }
}

/// Merges a list of neighbour counts into ranges.
fn count_ranges(counts: &[u8]) -> Option<Ranges> {
    Ranges::new(counts.iter().map(|&n| Range::single(n as u32))).ok()
}

impl ParseLife for LifeLike {
    fn from_bs(b: Vec<u8>, s: Vec<u8>) -> Self {
        Self::new(b, s)
    }
}

impl ParseLifeGen for LifeLike {
    fn from_bsg(b: Vec<u8>, s: Vec<u8>, gen: usize) -> Self {
        Self::new_gen(b, s, gen)
    }
}

impl FromStr for LifeLike {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Ok(rule) = <LifeLike as ParseLife>::parse_rule(input) {
            return Ok(rule);
        }
        let rule = <LifeLike as ParseLifeGen>::parse_rule(input).map_err(Error::ParseRuleError)?;
        if rule.gen > CellSystem::MAX_CELL_TYPES {
            Err(Error::TooManyCellTypes)
        } else {
            Ok(rule)
        }
    }
}

impl Display for LifeLike {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "B")?;
        for n in &self.birth {
            write!(f, "{}", n)?;
        }
        write!(f, "/S")?;
        for n in &self.survival {
            write!(f, "{}", n)?;
        }
        if self.gen > 2 {
            write!(f, "/C{}", self.gen)?;
        }
        Ok(())
    }
}

/// Parses a Life-like or Generations rule string into a cell system.
pub fn life_like(rule_string: &str) -> Result<CellSystem, Error> {
    Ok(rule_string.parse::<LifeLike>()?.cell_system())
}
