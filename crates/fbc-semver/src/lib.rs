//! Semantic version parsing and version range matching for operator
//! catalogs.
//!
//! Bundle versions are parsed in strict `MAJOR.MINOR.PATCH[-PRE][+BUILD]`
//! form; ranges use the constraint dialect of catalog filter configurations
//! (`">=0.8.1 <=0.8.3"`, `"^1.2 || 2.x"`, hyphen ranges, wildcards), with
//! build metadata ignored for comparison and prereleases admitted only by
//! comparators that themselves carry one.

pub mod constraint;
mod error;
mod range;
mod version;

pub use constraint::{Comparator, Operator};
pub use error::ParseError;
pub use range::VersionRange;
pub use version::{PreId, Version};
