//! Closed intervals of neighbour counts.
//!
//! A [`Condition`](crate::Condition) matches the weighted count of one cell
//! type against a [`Ranges`], which is a minimal, sorted set of disjoint
//! [`Range`]s.
//!
//! Both types have a textual form:
//!
//! * `N` means exactly `N`;
//! * `-N` means from `0` to `N`;
//! * `N-` means `N` or more;
//! * `N-M` means from `N` to `M`.
//!
//! Several ranges are separated by commas, e.g. `-1,4-`.

use crate::error::Error;
use std::{
    cmp,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed interval `[lower, upper]` of non-negative integers.
///
/// The upper bound may be [`Range::INFINITY`], in which case the range
/// has no upper limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Range {
    lower: u32,
    upper: u32,
}

impl Range {
    /// The upper bound of an unbounded range.
    pub const INFINITY: u32 = u32::MAX;

    /// Creates a new range.
    ///
    /// Fails if `lower` is negative, or greater than `upper`.
    pub fn new(lower: i64, upper: i64) -> Result<Self, Error> {
        if lower < 0 || lower > upper || upper > Self::INFINITY as i64 {
            return Err(Error::InvalidRange(lower, upper));
        }
        Ok(Range {
            lower: lower as u32,
            upper: upper as u32,
        })
    }

    /// A range containing exactly one value.
    pub fn single(value: u32) -> Self {
        Range {
            lower: value,
            upper: value,
        }
    }

    /// A range from `lower` upwards, without upper limit.
    pub fn at_least(lower: u32) -> Self {
        Range {
            lower,
            upper: Self::INFINITY,
        }
    }

    /// The lower bound.
    pub fn lower(&self) -> u32 {
        self.lower
    }

    /// The upper bound. [`Range::INFINITY`] if unbounded.
    pub fn upper(&self) -> u32 {
        self.upper
    }

    /// Whether the range has no upper limit.
    pub fn is_unbounded(&self) -> bool {
        self.upper == Self::INFINITY
    }

    /// Whether `value` lies in the range.
    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.lower as i64 <= value && (self.is_unbounded() || value <= self.upper as i64)
    }

    /// Merges two ranges if they overlap or are adjacent.
    ///
    /// Returns `None` if there is a gap between them.
    pub fn union(&self, other: &Range) -> Option<Range> {
        if other.lower < self.lower {
            return other.union(self);
        }
        if self.upper as i64 >= other.lower as i64 - 1 {
            Some(Range {
                lower: self.lower,
                upper: cmp::max(self.upper, other.upper),
            })
        } else {
            None
        }
    }
}

impl FromStr for Range {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |bound: &str| {
            bound
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::UnparsableRange(s.to_string()))
        };
        match s.find('-') {
            None => {
                let bound = parse(s)?;
                Range::new(bound, bound)
            }
            Some(pos) => {
                let lower = s[..pos].trim();
                let upper = s[pos + 1..].trim();
                if lower.is_empty() {
                    Range::new(0, parse(upper)?)
                } else if upper.is_empty() {
                    Range::new(parse(lower)?, Self::INFINITY as i64)
                } else {
                    Range::new(parse(lower)?, parse(upper)?)
                }
            }
        }
    }
}

impl TryFrom<String> for Range {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Range> for String {
    fn from(range: Range) -> Self {
        range.to_string()
    }
}

impl Display for Range {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.lower == self.upper {
            write!(f, "{}", self.lower)
        } else if self.lower == 0 {
            if self.is_unbounded() {
                write!(f, "0-")
            } else {
                write!(f, "-{}", self.upper)
            }
        } else if self.is_unbounded() {
            write!(f, "{}-", self.lower)
        } else {
            write!(f, "{}-{}", self.lower, self.upper)
        }
    }
}

/// A non-empty, sorted set of pairwise disjoint [`Range`]s.
///
/// Overlapping or adjacent ranges are merged on construction,
/// so two `Ranges` matching the same values are always equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Ranges {
    ranges: Vec<Range>,
}

impl Ranges {
    /// Creates the minimal set of disjoint ranges covering the given ranges.
    pub fn new<I: IntoIterator<Item = Range>>(ranges: I) -> Result<Self, Error> {
        let mut sorted: Vec<Range> = ranges.into_iter().collect();
        if sorted.is_empty() {
            return Err(Error::EmptyRanges);
        }
        sorted.sort_by_key(|range| range.lower);

        let mut merged: Vec<Range> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) => match last.union(&range) {
                    Some(union) => *last = union,
                    None => merged.push(range),
                },
                None => merged.push(range),
            }
        }
        Ok(Ranges { ranges: merged })
    }

    /// The disjoint ranges, sorted by their lower bounds.
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Whether `value` lies in one of the ranges.
    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        let first = self.ranges[0];
        let last = self.ranges[self.ranges.len() - 1];
        if (first.lower as i64) > value || (!last.is_unbounded() && (last.upper as i64) < value) {
            return false;
        }
        if self.ranges.len() == 1 {
            return true;
        }
        self.ranges.iter().any(|range| range.contains(value))
    }
}

impl From<Range> for Ranges {
    fn from(range: Range) -> Self {
        Ranges {
            ranges: vec![range],
        }
    }
}

impl FromStr for Ranges {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ranges = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<Range>, _>>()?;
        Ranges::new(ranges)
    }
}

impl TryFrom<String> for Ranges {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Ranges> for String {
    fn from(ranges: Ranges) -> Self {
        ranges.to_string()
    }
}

impl Display for Ranges {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", range)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range() -> Result<(), Error> {
        assert_eq!("3".parse::<Range>()?, Range::new(3, 3)?);
        assert_eq!("-4".parse::<Range>()?, Range::new(0, 4)?);
        assert_eq!("5-".parse::<Range>()?, Range::at_least(5));
        assert_eq!(" 2 - 7 ".parse::<Range>()?, Range::new(2, 7)?);
        Ok(())
    }

    #[test]
    fn parse_range_errors() {
        assert_eq!(
            "x".parse::<Range>(),
            Err(Error::UnparsableRange(String::from("x")))
        );
        assert_eq!(
            "-".parse::<Range>(),
            Err(Error::UnparsableRange(String::from("-")))
        );
        assert_eq!("7-2".parse::<Range>(), Err(Error::InvalidRange(7, 2)));
        assert_eq!("--3".parse::<Range>(), Err(Error::InvalidRange(0, -3)));
        assert_eq!(Range::new(-1, 2), Err(Error::InvalidRange(-1, 2)));
    }

    #[test]
    fn display_range() -> Result<(), Error> {
        for s in &["3", "-4", "5-", "2-7", "0-", "0"] {
            assert_eq!(s.parse::<Range>()?.to_string(), *s);
        }
        assert_eq!(Range::new(0, 0)?.to_string(), "0");
        Ok(())
    }

    #[test]
    fn union() -> Result<(), Error> {
        let a = Range::new(1, 3)?;
        assert_eq!(a.union(&Range::new(4, 6)?), Some(Range::new(1, 6)?));
        assert_eq!(Range::new(4, 6)?.union(&a), Some(Range::new(1, 6)?));
        assert_eq!(a.union(&Range::new(2, 2)?), Some(a));
        assert_eq!(a.union(&Range::new(5, 6)?), None);
        assert_eq!(a.union(&Range::at_least(0)), Some(Range::at_least(0)));
        Ok(())
    }

    #[test]
    fn union_preserves_membership() -> Result<(), Error> {
        for a_lower in 0..6 {
            for a_upper in a_lower..6 {
                for b_lower in 0..6 {
                    for b_upper in b_lower..6 {
                        let a = Range::new(a_lower, a_upper)?;
                        let b = Range::new(b_lower, b_upper)?;
                        if let Some(c) = a.union(&b) {
                            for v in -1..8 {
                                assert_eq!(a.contains(v) || b.contains(v), c.contains(v));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn canonical_ranges() -> Result<(), Error> {
        assert_eq!("3,1-2".parse::<Ranges>()?.to_string(), "1-3");
        assert_eq!("-1,4-".parse::<Ranges>()?.to_string(), "-1,4-");
        assert_eq!("8,2,3,5-6".parse::<Ranges>()?.to_string(), "2-3,5-6,8");
        assert_eq!("4-,10".parse::<Ranges>()?.to_string(), "4-");
        for s in &["3,1-2", "7, 1 ,2-3", "0-,5"] {
            let once = s.parse::<Ranges>()?.to_string();
            let twice = once.parse::<Ranges>()?.to_string();
            assert_eq!(once, twice);
        }
        Ok(())
    }

    #[test]
    fn empty_ranges() {
        assert_eq!(Ranges::new(Vec::new()), Err(Error::EmptyRanges));
        assert_eq!(
            "".parse::<Ranges>(),
            Err(Error::UnparsableRange(String::new()))
        );
    }

    #[test]
    fn ranges_contains() -> Result<(), Error> {
        let ranges: Ranges = "-1,4-5,9-".parse()?;
        let expected = [true, true, false, false, true, true, false, false, false, true, true];
        for (v, &e) in expected.iter().enumerate() {
            assert_eq!(ranges.contains(v as i64), e, "value {}", v);
        }
        assert!(!ranges.contains(-1));
        assert!(ranges.contains(i64::from(u32::MAX) + 10));
        Ok(())
    }

    #[test]
    #[cfg(feature = "serde")]
    fn serde_as_string() -> Result<(), Box<dyn std::error::Error>> {
        let ranges: Ranges = "3,1-2".parse()?;
        let json = serde_json::to_string(&ranges)?;
        assert_eq!(json, "\"1-3\"");
        let back: Ranges = serde_json::from_str("\"-1,4-\"")?;
        assert_eq!(back.to_string(), "-1,4-");
        assert!(serde_json::from_str::<Ranges>("\"\"").is_err());
        Ok(())
    }
}
