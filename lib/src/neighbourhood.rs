//! Weighted neighbourhoods.

use crate::error::Error;
use std::cmp;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A weighted square kernel around a cell.
///
/// The kernel has a radius `r` between [`MIN_RADIUS`](Self::MIN_RADIUS)
/// and [`MAX_RADIUS`](Self::MAX_RADIUS), and a weight for every offset
/// `(x, y)` with `|x|, |y| <= r`. The weight of a neighbour is added
/// to the counters of its cell type when a transition is computed.
///
/// The weight of the center `(0, 0)` is always `0`.
///
/// With `serde`, a neighbourhood is stored as the flat list of its weights,
/// row by row.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "Vec<i32>", into = "Vec<i32>")
)]
pub struct Neighbourhood {
    radius: i32,
    weights: Vec<i32>,
}

impl Neighbourhood {
    /// Minimal radius.
    pub const MIN_RADIUS: i32 = 1;
    /// Maximal radius.
    pub const MAX_RADIUS: i32 = 4;

    /// A neighbourhood with the given radius, and all weights `0`.
    pub fn with_radius(radius: i32) -> Result<Self, Error> {
        check_radius(radius)?;
        let side = (2 * radius + 1) as usize;
        Ok(Neighbourhood {
            radius,
            weights: vec![0; side * side],
        })
    }

    /// The [Moore neighbourhood](https://conwaylife.com/wiki/Moore_neighbourhood):
    /// radius `1`, all eight neighbours weighted `1`.
    pub fn moore() -> Self {
        let mut weights = vec![1; 9];
        weights[4] = 0;
        Neighbourhood { radius: 1, weights }
    }

    /// The [von Neumann neighbourhood](https://conwaylife.com/wiki/Von_Neumann_neighbourhood)
    /// of the given radius: every neighbour within Manhattan distance `radius`
    /// is weighted `1`.
    pub fn von_neumann(radius: i32) -> Result<Self, Error> {
        let mut nbhd = Self::with_radius(radius)?;
        for x in -radius..=radius {
            for y in -radius..=radius {
                if x.abs() + y.abs() <= radius {
                    nbhd.set_weight_at(x, y, 1)?;
                }
            }
        }
        Ok(nbhd)
    }

    /// Creates a neighbourhood from a flat list of weights, row by row.
    ///
    /// The length of the list must be `(2r + 1)²` for a valid radius `r`.
    /// The center weight is set to `0`.
    pub fn from_weights(mut weights: Vec<i32>) -> Result<Self, Error> {
        let len = weights.len();
        let radius = (((len as f64).sqrt() as i32) - 1) / 2;
        let side = (2 * radius + 1) as usize;
        if side * side != len || check_radius(radius).is_err() {
            return Err(Error::InvalidWeights(len));
        }
        weights[index(radius, 0, 0)] = 0;
        Ok(Neighbourhood { radius, weights })
    }

    /// The radius.
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// The flat list of weights, row by row.
    pub fn weights(&self) -> &[i32] {
        &self.weights
    }

    /// Changes the radius.
    ///
    /// Weights within the smaller of the old and new radius are kept,
    /// all other weights become `0`.
    pub fn set_radius(&mut self, radius: i32) -> Result<(), Error> {
        if radius == self.radius {
            return Ok(());
        }
        check_radius(radius)?;
        let side = (2 * radius + 1) as usize;
        let mut weights = vec![0; side * side];
        let min_radius = cmp::min(self.radius, radius);
        for x in -min_radius..=min_radius {
            for y in -min_radius..=min_radius {
                weights[index(radius, x, y)] = self.weights[index(self.radius, x, y)];
            }
        }
        weights[index(radius, 0, 0)] = 0;
        self.radius = radius;
        self.weights = weights;
        Ok(())
    }

    /// The weight at offset `(x, y)`.
    pub fn weight_at(&self, x: i32, y: i32) -> Result<i32, Error> {
        self.check_coord(x, y)?;
        Ok(self.weights[index(self.radius, x, y)])
    }

    /// Sets the weight at offset `(x, y)`.
    ///
    /// Setting the center has no effect: its weight stays `0`.
    pub fn set_weight_at(&mut self, x: i32, y: i32, weight: i32) -> Result<(), Error> {
        self.check_coord(x, y)?;
        self.weights[index(self.radius, x, y)] = weight;
        self.weights[index(self.radius, 0, 0)] = 0;
        Ok(())
    }

    /// Exports the weights as a dense matrix.
    pub fn weights_array(&self) -> WeightMatrix {
        let side = 2 * self.radius + 1;
        let mut weights = Vec::with_capacity((side * side) as usize);
        for y in -self.radius..=self.radius {
            for x in -self.radius..=self.radius {
                weights.push(self.weights[index(self.radius, x, y)]);
            }
        }
        WeightMatrix {
            radius: self.radius,
            weights: weights.into_boxed_slice(),
        }
    }

    fn check_coord(&self, x: i32, y: i32) -> Result<(), Error> {
        let r = self.radius;
        if x < -r || x > r || y < -r || y > r {
            Err(Error::OutOfRangeCoordinate(x, y, r))
        } else {
            Ok(())
        }
    }
}

impl Default for Neighbourhood {
    fn default() -> Self {
        Self::moore()
    }
}

impl TryFrom<Vec<i32>> for Neighbourhood {
    type Error = Error;

    fn try_from(weights: Vec<i32>) -> Result<Self, Self::Error> {
        Self::from_weights(weights)
    }
}

impl From<Neighbourhood> for Vec<i32> {
    fn from(nbhd: Neighbourhood) -> Self {
        nbhd.weights
    }
}

/// A dense matrix of weights, exported from a [`Neighbourhood`].
///
/// Indices run from `0` to `2r` in both directions;
/// the center is at `(r, r)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeightMatrix {
    radius: i32,
    weights: Box<[i32]>,
}

impl WeightMatrix {
    /// The radius of the neighbourhood it was exported from.
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Length of a side.
    pub fn side(&self) -> usize {
        (2 * self.radius + 1) as usize
    }

    /// The weight at `(x, y)`, where `0 <= x, y <= 2r`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> i32 {
        self.weights[x + y * self.side()]
    }
}

fn check_radius(radius: i32) -> Result<(), Error> {
    if (Neighbourhood::MIN_RADIUS..=Neighbourhood::MAX_RADIUS).contains(&radius) {
        Ok(())
    } else {
        Err(Error::InvalidRadius(radius.into()))
    }
}

/// Position of offset `(x, y)` in the flat weight list of radius `radius`.
#[inline]
fn index(radius: i32, x: i32, y: i32) -> usize {
    ((x + radius) + (y + radius) * (2 * radius + 1)) as usize
}
