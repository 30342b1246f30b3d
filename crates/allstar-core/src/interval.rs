//! Closed integer intervals and canonical interval sets.
//!
//! An [`IntervalSet`] is a sorted list of non-overlapping, non-adjacent
//! closed intervals. Every mutating operation restores that canonical form,
//! so equality and hashing work structurally and `contains` is a binary
//! search. The runtime uses interval sets for token-type algebra: FIRST
//! sets, expected-token sets, and error-recovery sets.

use std::fmt;
use std::str::FromStr;

use crate::token::TOKEN_EOF;
use crate::vocabulary::Vocabulary;

/// A closed integer range `[a, b]` with `a <= b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub a: i32,
    pub b: i32,
}

impl Interval {
    /// Create a closed interval. `a` must not exceed `b`.
    #[inline]
    pub fn new(a: i32, b: i32) -> Self {
        debug_assert!(a <= b, "inverted interval {a}..{b}");
        Self { a, b }
    }

    /// Number of elements covered.
    #[inline]
    pub fn length(&self) -> usize {
        (self.b - self.a + 1) as usize
    }

    #[inline]
    pub fn contains(&self, x: i32) -> bool {
        self.a <= x && x <= self.b
    }

    /// True if the union of `self` and `other` is a single interval.
    #[inline]
    fn touches(&self, other: &Interval) -> bool {
        // overlap, or adjacency like 1..3 + 4..6
        self.a <= other.b.saturating_add(1) && other.a <= self.b.saturating_add(1)
    }
}

/// Error from parsing an [`IntervalSet`] display string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed interval set at {input:?}")]
pub struct IntervalSetParseError {
    pub input: String,
}

/// Sorted list of disjoint, non-adjacent closed intervals.
#[derive(Clone, Debug, Default)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
    read_only: bool,
}

// Equality and hashing consider only the canonical intervals, never the
// read-only flag.
impl PartialEq for IntervalSet {
    fn eq(&self, other: &Self) -> bool {
        self.intervals == other.intervals
    }
}

impl Eq for IntervalSet {}

impl std::hash::Hash for IntervalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.intervals.hash(state);
    }
}

impl IntervalSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing the single element `a`.
    pub fn of(a: i32) -> Self {
        Self::of_range(a, a)
    }

    /// Set containing the closed range `a..b`.
    pub fn of_range(a: i32, b: i32) -> Self {
        let mut s = Self::new();
        s.add_range(a, b);
        s
    }

    /// Number of elements (not intervals).
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Mark the set immutable. Further mutation panics.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The underlying canonical intervals.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Add the single element `x`.
    pub fn add(&mut self, x: i32) {
        self.add_range(x, x);
    }

    /// Add the closed range `a..b`, coalescing with any overlapping or
    /// adjacent intervals.
    pub fn add_range(&mut self, a: i32, b: i32) {
        self.add_interval(Interval::new(a, b));
    }

    fn add_interval(&mut self, added: Interval) {
        assert!(!self.read_only, "attempt to modify read-only IntervalSet");

        // position of the first interval that could touch `added`
        let start = self
            .intervals
            .partition_point(|iv| iv.b.saturating_add(1) < added.a);

        let mut merged = added;
        let mut end = start;
        while end < self.intervals.len() && merged.touches(&self.intervals[end]) {
            merged.a = merged.a.min(self.intervals[end].a);
            merged.b = merged.b.max(self.intervals[end].b);
            end += 1;
        }
        self.intervals.splice(start..end, [merged]);

        self.assert_canonical();
    }

    /// Union with another set.
    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_interval(*iv);
        }
    }

    /// Union, producing a new set.
    pub fn or(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = self.clone();
        result.read_only = false;
        result.add_set(other);
        result
    }

    /// Intersection, producing a new set.
    pub fn and(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let x = self.intervals[i];
            let y = other.intervals[j];
            let lo = x.a.max(y.a);
            let hi = x.b.min(y.b);
            if lo <= hi {
                result.add_range(lo, hi);
            }
            if x.b < y.b {
                i += 1;
            } else {
                j += 1;
            }
        }
        result
    }

    /// Difference `self - other`, producing a new set.
    pub fn subtract(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = IntervalSet::new();
        let mut j = 0;
        for &iv in &self.intervals {
            let mut lo = iv.a;
            // skip other-intervals entirely below `iv`
            while j < other.intervals.len() && other.intervals[j].b < iv.a {
                j += 1;
            }
            let mut k = j;
            while k < other.intervals.len() && other.intervals[k].a <= iv.b {
                let cut = other.intervals[k];
                if cut.a > lo {
                    result.add_range(lo, cut.a - 1);
                }
                lo = lo.max(cut.b.saturating_add(1));
                k += 1;
            }
            if lo <= iv.b {
                result.add_range(lo, iv.b);
            }
        }
        result
    }

    /// Complement within the universe `min..max`.
    pub fn complement(&self, min: i32, max: i32) -> IntervalSet {
        IntervalSet::of_range(min, max).subtract(self)
    }

    /// Remove the single element `x`.
    pub fn remove(&mut self, x: i32) {
        assert!(!self.read_only, "attempt to modify read-only IntervalSet");
        *self = self.subtract(&IntervalSet::of(x));
    }

    /// Binary-search membership test.
    pub fn contains(&self, x: i32) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if x < iv.a {
                    std::cmp::Ordering::Greater
                } else if x > iv.b {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Smallest element. Panics on an empty set.
    pub fn min_element(&self) -> i32 {
        assert!(!self.is_empty(), "min_element of empty IntervalSet");
        self.intervals[0].a
    }

    /// Largest element. Panics on an empty set.
    pub fn max_element(&self) -> i32 {
        assert!(!self.is_empty(), "max_element of empty IntervalSet");
        self.intervals[self.intervals.len() - 1].b
    }

    /// Render with token display names instead of numbers.
    pub fn to_token_string(&self, vocabulary: &Vocabulary) -> String {
        if self.intervals.is_empty() {
            return "{}".to_owned();
        }
        let mut names = Vec::with_capacity(self.len());
        for iv in &self.intervals {
            for t in iv.a..=iv.b {
                names.push(vocabulary.display_name(t));
            }
        }
        if names.len() == 1 {
            names.pop().unwrap()
        } else {
            format!("{{{}}}", names.join(", "))
        }
    }

    fn assert_canonical(&self) {
        debug_assert!(
            self.intervals.windows(2).all(|w| {
                w[0].a <= w[0].b && w[1].a <= w[1].b && w[0].b.saturating_add(1) < w[1].a
            }),
            "IntervalSet lost canonical form: {:?}",
            self.intervals
        );
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "{{}}");
        }
        let braces = self.len() > 1;
        if braces {
            write!(f, "{{")?;
        }
        for (i, iv) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if iv.a == iv.b {
                if iv.a == TOKEN_EOF {
                    write!(f, "<EOF>")?;
                } else {
                    write!(f, "{}", iv.a)?;
                }
            } else {
                write!(f, "{}..{}", iv.a, iv.b)?;
            }
        }
        if braces {
            write!(f, "}}")?;
        }
        Ok(())
    }
}

impl FromStr for IntervalSet {
    type Err = IntervalSetParseError;

    /// Parse the [`fmt::Display`] format back into a set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || IntervalSetParseError {
            input: s.to_owned(),
        };
        let body = s.trim();
        let body = body
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(body);

        let mut set = IntervalSet::new();
        for part in body.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part == "<EOF>" {
                set.add(TOKEN_EOF);
            } else if let Some((lo, hi)) = split_range(part) {
                let a: i32 = lo.parse().map_err(|_| err())?;
                let b: i32 = hi.parse().map_err(|_| err())?;
                if a > b {
                    return Err(err());
                }
                set.add_range(a, b);
            } else {
                set.add(part.parse().map_err(|_| err())?);
            }
        }
        Ok(set)
    }
}

/// Split `"a..b"` on the range separator, tolerating a negative `a`.
fn split_range(part: &str) -> Option<(&str, &str)> {
    let idx = part[1..].find("..").map(|i| i + 1)?;
    Some((&part[..idx], &part[idx + 2..]))
}
