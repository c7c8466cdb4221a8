//! A single comparator inside a version range.

use std::fmt;

use super::Operator;
use crate::Version;

/// One `<op> <version>` comparison, e.g. `>=0.8.1`.
///
/// Partial and wildcard versions are expanded into full-version comparators
/// by the range parser, so the version held here is always complete.
#[derive(Debug, Clone)]
pub struct Comparator {
    op: Operator,
    version: Version,
}

impl Comparator {
    pub fn new(op: Operator, version: Version) -> Self {
        Comparator { op, version }
    }

    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Check a candidate version against this comparator.
    ///
    /// A candidate carrying a prerelease only matches when the comparator's
    /// own version carries one, so plain ranges never admit prereleases.
    pub fn matches(&self, candidate: &Version) -> bool {
        if candidate.is_prerelease() && !self.version.is_prerelease() {
            return false;
        }
        match self.op {
            Operator::Equal => candidate == &self.version,
            Operator::NotEqual => candidate != &self.version,
            Operator::LessThan => candidate < &self.version,
            Operator::LessThanOrEqual => candidate <= &self.version,
            Operator::GreaterThan => candidate > &self.version,
            Operator::GreaterThanOrEqual => candidate >= &self.version,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}
