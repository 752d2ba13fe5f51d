//! The value-count contract.
//!
//! Every [`ArgumentType`](crate::ArgumentType) declares how many values one
//! occurrence of its argument takes. The parser uses the range both as a
//! scanning limit (outside tuples) and as the validity check for what it
//! collected.

use std::fmt;

/// An inclusive range of value counts, `[min, max]`, where `max` may be
/// unbounded.
///
/// # Example
///
/// ```
/// use argweave::ValueCount;
///
/// let range = ValueCount::between(1, 3);
/// assert!(range.contains(2));
/// assert!(!range.contains(4));
/// assert_eq!(range.to_string(), "1-3");
///
/// assert!(ValueCount::NONE.is_zero());
/// assert_eq!(ValueCount::AT_LEAST_ONE.to_string(), "1+");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueCount {
    min: usize,
    max: Option<usize>,
}

impl ValueCount {
    /// Takes no values (`[0, 0]`), e.g. a flag.
    pub const NONE: ValueCount = ValueCount {
        min: 0,
        max: Some(0),
    };

    /// Exactly one value.
    pub const ONE: ValueCount = ValueCount {
        min: 1,
        max: Some(1),
    };

    /// One or more values.
    pub const AT_LEAST_ONE: ValueCount = ValueCount { min: 1, max: None };

    /// Any number of values, including none.
    pub const ANY: ValueCount = ValueCount { min: 0, max: None };

    /// A range of exactly `n` values.
    pub const fn exactly(n: usize) -> Self {
        ValueCount {
            min: n,
            max: Some(n),
        }
    }

    /// A bounded range.
    ///
    /// # Panics
    ///
    /// Panics if `min > max`. Ranges are declared statically by argument
    /// types, so an inverted range is a programming error.
    pub fn between(min: usize, max: usize) -> Self {
        assert!(min <= max, "invalid value count range: {min} > {max}");
        ValueCount {
            min,
            max: Some(max),
        }
    }

    /// A range with a lower bound and no upper bound.
    pub const fn at_least(min: usize) -> Self {
        ValueCount { min, max: None }
    }

    /// Lower bound.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Upper bound, `None` when unbounded.
    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Returns `true` when the range has no upper bound.
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Returns `true` for `[0, 0]`.
    pub fn is_zero(&self) -> bool {
        self.min == 0 && self.max == Some(0)
    }

    /// Returns `true` if `n` lies within the range.
    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }

    /// Returns `true` once `n` values fill the range.
    pub(crate) fn is_full(&self, n: usize) -> bool {
        self.max.is_some_and(|max| n >= max)
    }
}

impl fmt::Display for ValueCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            None => write!(f, "{}+", self.min),
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{}-{}", self.min, max),
        }
    }
}
