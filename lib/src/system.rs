//! Cell systems: cell types and their rule tables.
//!
//! A [`CellSystem`] is an ordered list of [`CellType`]s. The id of a cell type
//! is always its position in that list. Rules, conditions and default
//! transitions refer to other cell types by id, so every structural edit
//! ([`insert_cell_type`](CellSystem::insert_cell_type),
//! [`remove_cell_type`](CellSystem::remove_cell_type),
//! [`swap_cell_types`](CellSystem::swap_cell_types)) renumbers all these
//! references in a single pass.

use crate::{error::Error, neighbourhood::Neighbourhood, range::Ranges};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A test that the weighted count of one cell type lies in some [`Ranges`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    /// The id of the cell type whose weighted count is tested.
    ///
    /// The count for id `0` is the total weight of all neighbours
    /// which are not of cell type `0`.
    pub cell_type: usize,

    /// The accepted counts.
    pub ranges: Ranges,
}

impl Condition {
    /// Creates a new condition.
    pub fn new(cell_type: usize, ranges: Ranges) -> Self {
        Condition { cell_type, ranges }
    }
}

/// A list of conditions, and the cell type to become when all of them hold.
///
/// A rule without conditions always fires.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rule {
    /// The id of the cell type to become.
    pub target_cell_type: usize,

    /// The conditions. All of them must hold for the rule to fire.
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Creates a new rule without conditions.
    pub fn new(target_cell_type: usize) -> Self {
        Rule {
            target_cell_type,
            conditions: Vec::new(),
        }
    }

    /// Adds a condition.
    pub fn with_condition(mut self, cell_type: usize, ranges: Ranges) -> Self {
        self.conditions.push(Condition::new(cell_type, ranges));
        self
    }

    /// Appends a condition.
    pub fn push_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Removes the condition at `index`, if there is one.
    pub fn remove_condition(&mut self, index: usize) -> Option<Condition> {
        if index < self.conditions.len() {
            Some(self.conditions.remove(index))
        } else {
            None
        }
    }

    /// Swaps two conditions.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn swap_conditions(&mut self, index1: usize, index2: usize) {
        self.conditions.swap(index1, index2);
    }
}

/// A cell type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellType {
    /// Position in the owning cell system.
    #[cfg_attr(feature = "serde", serde(skip))]
    id: usize,

    /// A human readable name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,

    /// Overrides the neighbourhood of the cell system.
    #[cfg_attr(feature = "serde", serde(default))]
    pub neighbourhood: Option<Neighbourhood>,

    /// The rules, in the order they are tried.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<Rule>,

    /// The cell type to become when no rule fires.
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_cell_type: usize,
}

impl CellType {
    /// The id, which is the position in the owning cell system.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Sets the name.
    pub fn set_name<S: ToString>(&mut self, name: S) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the default transition.
    pub fn set_default_cell_type(&mut self, default_cell_type: usize) -> &mut Self {
        self.default_cell_type = default_cell_type;
        self
    }

    /// Sets the neighbourhood override.
    pub fn set_neighbourhood<T: Into<Option<Neighbourhood>>>(&mut self, neighbourhood: T) -> &mut Self {
        self.neighbourhood = neighbourhood.into();
        self
    }

    /// Appends a rule.
    pub fn push_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Removes the rule at `index`, if there is one.
    pub fn remove_rule(&mut self, index: usize) -> Option<Rule> {
        if index < self.rules.len() {
            Some(self.rules.remove(index))
        } else {
            None
        }
    }

    /// Swaps two rules.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn swap_rules(&mut self, index1: usize, index2: usize) {
        self.rules.swap(index1, index2);
    }
}

/// A renumbering of cell type ids.
#[derive(Clone, Copy, Debug)]
enum Remap {
    /// A cell type is inserted at this position.
    Insert(usize),
    /// The cell type at this position is removed.
    Remove(usize),
    /// Two cell types change places.
    Swap(usize, usize),
}

impl Remap {
    /// The new id of a reference. `None` if the reference is dropped.
    fn apply(self, id: usize) -> Option<usize> {
        match self {
            Remap::Insert(i) if id >= i => Some(id + 1),
            Remap::Remove(i) if id == i => None,
            Remap::Remove(i) if id > i => Some(id - 1),
            Remap::Swap(i, j) if id == i => Some(j),
            Remap::Swap(i, j) if id == j => Some(i),
            _ => Some(id),
        }
    }

    /// The new default transition of a cell type.
    ///
    /// A default transition is never dropped. If its target is removed,
    /// it falls back to the previous cell type.
    fn apply_default(self, id: usize) -> usize {
        match self {
            Remap::Remove(i) if id >= i => id.saturating_sub(1),
            _ => self.apply(id).unwrap_or(id),
        }
    }
}

/// A cell system: the cell types and their rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "CellSystemSer")
)]
pub struct CellSystem {
    /// A human readable name.
    pub name: Option<String>,

    /// A description.
    pub description: Option<String>,

    /// The neighbourhood for all cell types without an override.
    pub neighbourhood: Option<Neighbourhood>,

    /// The cell types. The id of each cell type is its position.
    cell_types: Vec<CellType>,
}

impl CellSystem {
    /// The maximal number of cell types.
    ///
    /// Cell type ids are stored as bytes in a [`Grid`](crate::Grid).
    pub const MAX_CELL_TYPES: usize = 255;

    /// Creates an empty cell system with the given neighbourhood.
    pub fn new<T: Into<Option<Neighbourhood>>>(neighbourhood: T) -> Self {
        CellSystem {
            neighbourhood: neighbourhood.into(),
            ..CellSystem::default()
        }
    }

    /// [Conway's Game of Life](https://conwaylife.com/wiki/Conway%27s_Game_of_Life).
    ///
    /// Cell type `0` is dead, cell type `1` is alive.
    pub fn conway() -> Self {
        crate::rules::LifeLike::new(vec![3], vec![2, 3]).cell_system()
    }

    /// Sets the name.
    pub fn set_name<S: ToString>(mut self, name: S) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the description.
    pub fn set_description<S: ToString>(mut self, description: S) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// All cell types, ordered by id.
    pub fn cell_types(&self) -> &[CellType] {
        &self.cell_types
    }

    /// Number of cell types.
    pub fn cell_type_count(&self) -> usize {
        self.cell_types.len()
    }

    /// The cell type with the given id.
    pub fn cell_type(&self, id: usize) -> Option<&CellType> {
        self.cell_types.get(id)
    }

    /// The cell type with the given id, mutably.
    pub fn cell_type_mut(&mut self, id: usize) -> Option<&mut CellType> {
        self.cell_types.get_mut(id)
    }

    /// Appends a new cell type without rules.
    pub fn push_cell_type(&mut self) -> Result<&mut CellType, Error> {
        self.insert_cell_type(self.cell_types.len())
    }

    /// Inserts a new cell type without rules at `index`.
    ///
    /// Every reference to a cell type with id `index` or higher is
    /// incremented, so it still refers to the same cell type afterwards.
    pub fn insert_cell_type(&mut self, index: usize) -> Result<&mut CellType, Error> {
        if index > self.cell_types.len() {
            return Err(Error::NoSuchCellType(index));
        }
        if self.cell_types.len() >= Self::MAX_CELL_TYPES {
            return Err(Error::TooManyCellTypes);
        }
        self.reindex(Remap::Insert(index));
        self.cell_types.insert(index, CellType::default());
        self.renumber();
        Ok(&mut self.cell_types[index])
    }

    /// Removes the cell type at `index`.
    ///
    /// Rules targeting the removed cell type, and conditions testing it,
    /// are removed as well. A rule which loses all its conditions this way
    /// is kept, and then always fires. A default transition to the removed
    /// cell type is redirected to the cell type before it.
    pub fn remove_cell_type(&mut self, index: usize) -> Result<CellType, Error> {
        if index >= self.cell_types.len() {
            return Err(Error::NoSuchCellType(index));
        }
        let removed = self.cell_types.remove(index);
        self.reindex(Remap::Remove(index));
        self.renumber();
        Ok(removed)
    }

    /// Swaps two cell types, and every reference to them.
    pub fn swap_cell_types(&mut self, index1: usize, index2: usize) -> Result<(), Error> {
        for &index in &[index1, index2] {
            if index >= self.cell_types.len() {
                return Err(Error::NoSuchCellType(index));
            }
        }
        if index1 == index2 {
            return Ok(());
        }
        self.reindex(Remap::Swap(index1, index2));
        self.cell_types.swap(index1, index2);
        self.renumber();
        Ok(())
    }

    /// The neighbourhood used by the cell type with the given id:
    /// its own override if it has one, else the one of the cell system.
    pub fn resolve_neighbourhood(&self, id: usize) -> Option<&Neighbourhood> {
        self.cell_types
            .get(id)
            .and_then(|cell_type| cell_type.neighbourhood.as_ref())
            .or_else(|| self.neighbourhood.as_ref())
    }

    /// Checks the structural invariants needed to run the cell system.
    ///
    /// * There is at least one cell type, and at most
    ///   [`MAX_CELL_TYPES`](Self::MAX_CELL_TYPES).
    /// * Every reference to a cell type is a valid id.
    /// * Every cell type has a neighbourhood.
    pub fn validate(&self) -> Result<(), Error> {
        let count = self.cell_types.len();
        if count == 0 {
            return Err(Error::NoCellTypes);
        }
        if count > Self::MAX_CELL_TYPES {
            return Err(Error::TooManyCellTypes);
        }
        for cell_type in &self.cell_types {
            let id = cell_type.id;
            let check = |other: usize| {
                if other < count {
                    Ok(())
                } else {
                    Err(Error::DanglingCellType(id, other))
                }
            };
            check(cell_type.default_cell_type)?;
            for rule in &cell_type.rules {
                check(rule.target_cell_type)?;
                for condition in &rule.conditions {
                    check(condition.cell_type)?;
                }
            }
            if self.resolve_neighbourhood(id).is_none() {
                return Err(Error::MissingNeighbourhood(id));
            }
        }
        Ok(())
    }

    /// Renumbers every cell type reference in one pass.
    fn reindex(&mut self, remap: Remap) {
        for cell_type in self.cell_types.iter_mut() {
            cell_type.default_cell_type = remap.apply_default(cell_type.default_cell_type);
            cell_type
                .rules
                .retain_mut(|rule| match remap.apply(rule.target_cell_type) {
                    Some(target) => {
                        rule.target_cell_type = target;
                        rule.conditions
                            .retain_mut(|condition| match remap.apply(condition.cell_type) {
                                Some(cell_type) => {
                                    condition.cell_type = cell_type;
                                    true
                                }
                                None => false,
                            });
                        true
                    }
                    None => false,
                });
        }
    }

    /// Makes every id equal to the position again.
    fn renumber(&mut self) {
        for (id, cell_type) in self.cell_types.iter_mut().enumerate() {
            cell_type.id = id;
        }
    }
}

/// A representation of [`CellSystem`] used for deserialization.
///
/// Ids are not stored; they are restored from the positions.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct CellSystemSer {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    neighbourhood: Option<Neighbourhood>,
    cell_types: Vec<CellType>,
}

#[cfg(feature = "serde")]
impl TryFrom<CellSystemSer> for CellSystem {
    type Error = Error;

    fn try_from(ser: CellSystemSer) -> Result<Self, Self::Error> {
        let mut cell_system = CellSystem {
            name: ser.name,
            description: ser.description,
            neighbourhood: ser.neighbourhood,
            cell_types: ser.cell_types,
        };
        cell_system.renumber();
        cell_system.validate()?;
        Ok(cell_system)
    }
}
