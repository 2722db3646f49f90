//! ## Categorical Levels
//!
//! This module defines the value types the transformers learn and rewrite:
//!
//! - [`Level`]: a single categorical value (string, integer, float, or the
//!   distinguished missing value).
//! - [`LevelFamily`]: the type family of a level, used to check that a
//!   configured sentinel label is compatible with the columns it is written into.
//! - [`LevelSet`]: an explicit ordered set of levels. Declared category
//!   universes and learned level mappings are modeled with this type so that
//!   "remove level" and "add sentinel level" are explicit operations.
//! - [`LevelCounts`]: weighted frequency accounting over levels, deciding the
//!   rare/common boundary with an inclusive cut-off comparison.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single categorical value observable in a column.
///
/// Missing values are a distinct level, not equal to any other level. Float
/// levels compare and hash by canonicalized bit pattern, so `-0.0` equals
/// `0.0` and all NaN payloads coincide.
#[derive(Debug, Clone)]
pub enum Level {
    Str(String),
    Int(i64),
    Float(f64),
    Missing,
}

/// The type family of a non-missing level, mirroring the supported column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFamily {
    Text,
    Integer,
    Real,
}

impl fmt::Display for LevelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelFamily::Text => write!(f, "text"),
            LevelFamily::Integer => write!(f, "integer"),
            LevelFamily::Real => write!(f, "real"),
        }
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        // Collapse -0.0 and 0.0.
        0
    } else {
        value.to_bits()
    }
}

impl Level {
    /// The type family of this level, or `None` for the missing value.
    pub fn family(&self) -> Option<LevelFamily> {
        match self {
            Level::Str(_) => Some(LevelFamily::Text),
            Level::Int(_) => Some(LevelFamily::Integer),
            Level::Float(_) => Some(LevelFamily::Real),
            Level::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Level::Missing)
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Level::Int(_) | Level::Float(_) => 0,
            Level::Str(_) => 1,
            Level::Missing => 2,
        }
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Level::Str(a), Level::Str(b)) => a == b,
            (Level::Int(a), Level::Int(b)) => a == b,
            (Level::Float(a), Level::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Level::Missing, Level::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Level {}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Level::Str(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Level::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Level::Float(f) => {
                2u8.hash(state);
                canonical_bits(*f).hash(state);
            }
            Level::Missing => 3u8.hash(state),
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order used to produce deterministic learned-level orderings: numeric
/// levels by value (integers before equal-valued floats), then strings
/// lexicographically, with the missing value last.
impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Level::Int(a), Level::Int(b)) => a.cmp(b),
            (Level::Str(a), Level::Str(b)) => a.cmp(b),
            (Level::Float(a), Level::Float(b)) => {
                if canonical_bits(*a) == canonical_bits(*b) {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (Level::Int(a), Level::Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Level::Float(a), Level::Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Level::Missing, Level::Missing) => Ordering::Equal,
            _ => self.sort_rank().cmp(&other.sort_rank()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Str(s) => write!(f, "{}", s),
            Level::Int(i) => write!(f, "{}", i),
            Level::Float(v) => write!(f, "{}", v),
            Level::Missing => write!(f, "null"),
        }
    }
}

impl From<&str> for Level {
    fn from(value: &str) -> Self {
        Level::Str(value.to_string())
    }
}

impl From<String> for Level {
    fn from(value: String) -> Self {
        Level::Str(value)
    }
}

impl From<i64> for Level {
    fn from(value: i64) -> Self {
        Level::Int(value)
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Level::Missing
        } else {
            Level::Float(value)
        }
    }
}

/// An ordered set of levels (insertion order, no duplicates).
///
/// Used both for learned level mappings and for declared category universes of
/// dictionary-encoded columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSet {
    levels: Vec<Level>,
}

impl LevelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a level, keeping insertion order. Returns false if already present.
    pub fn insert(&mut self, level: Level) -> bool {
        if self.contains(&level) {
            return false;
        }
        self.levels.push(level);
        true
    }

    /// Removes a level if present. Returns true if it was removed.
    pub fn remove(&mut self, level: &Level) -> bool {
        match self.levels.iter().position(|l| l == level) {
            Some(idx) => {
                self.levels.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, level: &Level) -> bool {
        self.levels.iter().any(|l| l == level)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Level> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns the set re-ordered by the [`Level`] total order (missing last).
    pub fn sorted(mut self) -> Self {
        self.levels.sort();
        self
    }

    pub fn as_slice(&self) -> &[Level] {
        &self.levels
    }
}

impl FromIterator<Level> for LevelSet {
    fn from_iter<T: IntoIterator<Item = Level>>(iter: T) -> Self {
        let mut set = LevelSet::new();
        for level in iter {
            set.insert(level);
        }
        set
    }
}

impl IntoIterator for LevelSet {
    type Item = Level;
    type IntoIter = std::vec::IntoIter<Level>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.into_iter()
    }
}

impl<'a> IntoIterator for &'a LevelSet {
    type Item = &'a Level;
    type IntoIter = std::slice::Iter<'a, Level>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}

/// Weighted frequency accounting over the distinct levels of one column.
///
/// Every observation contributes its weight to its level and to the total.
/// Relative frequency is the level's weight divided by the total weight, and
/// the retain decision uses an inclusive comparison against the cut-off: a
/// level sitting exactly on the boundary is retained.
#[derive(Debug, Clone, Default)]
pub struct LevelCounts {
    weights: HashMap<Level, f64>,
    total: f64,
}

impl LevelCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation of `level` with the given weight. Non-finite
    /// weights contribute nothing but still register the level as seen.
    pub fn add(&mut self, level: Level, weight: f64) {
        let entry = self.weights.entry(level).or_insert(0.0);
        if weight.is_finite() {
            *entry += weight;
            self.total += weight;
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Relative weighted frequency of a level; 0 for unseen levels or a
    /// non-positive total.
    pub fn frequency(&self, level: &Level) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        self.weights.get(level).map_or(0.0, |w| w / self.total)
    }

    /// The sorted set of levels whose relative frequency is >= `cut_off_fraction`.
    pub fn retained(&self, cut_off_fraction: f64) -> LevelSet {
        self.weights
            .keys()
            .filter(|level| self.frequency(level) >= cut_off_fraction)
            .cloned()
            .collect::<LevelSet>()
            .sorted()
    }

    /// The sorted set of every distinct level seen, regardless of frequency.
    pub fn levels(&self) -> LevelSet {
        self.weights
            .keys()
            .cloned()
            .collect::<LevelSet>()
            .sorted()
    }
}
