//! Version range parsing and matching.
//!
//! The grammar follows the range dialect used by operator catalog tooling:
//! comparators joined by whitespace or commas form a conjunction, `||`
//! separates alternative groups, and `~`, `^`, hyphen ranges, partial
//! versions and `x`/`*` wildcards expand into plain comparators.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::constraint::{Comparator, Operator};
use crate::{ParseError, Version};
use crate::version::PreId;

lazy_static! {
    // OR group splitter
    static ref OR_RE: Regex = Regex::new(r"\s*\|\|\s*").unwrap();

    // One comparator token: optional operator, then a (possibly partial) version
    static ref COMPARATOR_RE: Regex = Regex::new(
        r"^(?P<op>>=|<=|!=|==|=|>|<|\^|~>|~)?\s*(?P<ver>[vxX*0-9][0-9A-Za-z.+*-]*)$"
    )
    .unwrap();

    // Partial version: wildcard or numeric parts, optional prerelease and build
    static ref PARTIAL_RE: Regex = Regex::new(
        r"^v?(?P<major>\d+|[xX*])(?:\.(?P<minor>\d+|[xX*]))?(?:\.(?P<patch>\d+|[xX*]))?(?:-(?P<pre>[0-9A-Za-z.-]+))?(?:\+(?P<build>[0-9A-Za-z.-]+))?$"
    )
    .unwrap();
}

/// A parsed version range: a disjunction of conjunction groups.
#[derive(Debug, Clone)]
pub struct VersionRange {
    groups: Vec<Vec<Comparator>>,
    original: String,
}

impl VersionRange {
    /// Parse a range expression, e.g. `">=0.8.1 <=0.8.3"` or `"^1.2 || 2.x"`.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::InvalidConstraint(input.to_string()));
        }
        let mut groups = Vec::new();
        for group in OR_RE.split(trimmed) {
            groups.push(parse_group(group)?);
        }
        Ok(VersionRange { groups, original: trimmed.to_string() })
    }

    /// True if the version satisfies at least one conjunction group.
    pub fn matches(&self, version: &Version) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|c| c.matches(version)))
    }

    /// The range expression as written.
    pub fn original(&self) -> &str {
        &self.original
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for VersionRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

/// A version with possibly-missing or wildcard parts, as written in a
/// comparator. Wildcards and missing parts are equivalent.
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Vec<PreId>,
    build: Option<String>,
}

impl Partial {
    fn is_full(&self) -> bool {
        self.major.is_some() && self.minor.is_some() && self.patch.is_some()
    }

    /// Zero-fill missing parts.
    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: self.build.clone(),
        }
    }

    /// The lowest version above every version covered by this partial:
    /// `1` ⇒ `2.0.0`, `1.2` ⇒ `1.3.0`, full versions bump the patch.
    fn ceiling(&self) -> Version {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Version::new(major + 1, 0, 0),
            (Some(major), Some(minor), None) => Version::new(major, minor + 1, 0),
            (Some(major), Some(minor), Some(patch)) => Version::new(major, minor, patch + 1),
            (None, _, _) => Version::new(u64::MAX, 0, 0),
        }
    }
}

fn parse_group(group: &str) -> Result<Vec<Comparator>, ParseError> {
    let tokens: Vec<&str> = group
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(ParseError::InvalidConstraint(group.to_string()));
    }

    let mut comparators = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        // hyphen range: `<from> - <to>`
        if i + 2 < tokens.len() && tokens[i + 1] == "-" {
            expand_hyphen(tokens[i], tokens[i + 2], &mut comparators)?;
            i += 3;
            continue;
        }
        expand_comparator(tokens[i], &mut comparators)?;
        i += 1;
    }
    Ok(comparators)
}

fn parse_partial(token: &str) -> Result<Partial, ParseError> {
    let caps = PARTIAL_RE
        .captures(token)
        .ok_or_else(|| ParseError::InvalidConstraint(token.to_string()))?;

    let mut wildcard_seen = false;
    let mut part = |name: &str| -> Result<Option<u64>, ParseError> {
        match caps.name(name) {
            None => Ok(None),
            Some(m) if matches!(m.as_str(), "x" | "X" | "*") => {
                wildcard_seen = true;
                Ok(None)
            }
            Some(_) if wildcard_seen => {
                // a numeric part after a wildcard makes no sense
                Err(ParseError::InvalidConstraint(token.to_string()))
            }
            Some(m) => m
                .as_str()
                .parse()
                .map(Some)
                .map_err(|_| ParseError::InvalidConstraint(token.to_string())),
        }
    };

    let major = part("major")?;
    let minor = part("minor")?;
    let patch = part("patch")?;

    let pre = match caps.name("pre") {
        Some(m) => {
            let version = format!(
                "{}.{}.{}-{}",
                major.unwrap_or(0),
                minor.unwrap_or(0),
                patch.unwrap_or(0),
                m.as_str()
            );
            Version::parse(&version)
                .map_err(|_| ParseError::InvalidConstraint(token.to_string()))?
                .pre
        }
        None => Vec::new(),
    };

    // a prerelease or build suffix on a partial version is ambiguous
    if (!pre.is_empty() || caps.name("build").is_some())
        && (major.is_none() || minor.is_none() || patch.is_none())
    {
        return Err(ParseError::InvalidConstraint(token.to_string()));
    }

    Ok(Partial {
        major,
        minor,
        patch,
        pre,
        build: caps.name("build").map(|m| m.as_str().to_string()),
    })
}

fn expand_comparator(token: &str, out: &mut Vec<Comparator>) -> Result<(), ParseError> {
    let caps = COMPARATOR_RE
        .captures(token)
        .ok_or_else(|| ParseError::InvalidConstraint(token.to_string()))?;
    let op = caps.name("op").map(|m| m.as_str()).unwrap_or("");
    let partial = parse_partial(caps.name("ver").unwrap().as_str())?;

    match op {
        "~" | "~>" => expand_tilde(partial, out),
        "^" => expand_caret(partial, out),
        _ => {
            let op = Operator::from_str(op)
                .ok_or_else(|| ParseError::InvalidConstraint(token.to_string()))?;
            expand_plain(op, partial, token, out)?;
        }
    }
    Ok(())
}

fn expand_plain(
    op: Operator,
    partial: Partial,
    token: &str,
    out: &mut Vec<Comparator>,
) -> Result<(), ParseError> {
    if partial.is_full() {
        out.push(Comparator::new(op, partial.floor()));
        return Ok(());
    }
    match op {
        Operator::Equal => {
            if partial.major.is_none() {
                // `*` alone: every release version
                out.push(Comparator::new(Operator::GreaterThanOrEqual, Version::new(0, 0, 0)));
            } else {
                out.push(Comparator::new(Operator::GreaterThanOrEqual, partial.floor()));
                out.push(Comparator::new(Operator::LessThan, partial.ceiling()));
            }
        }
        Operator::GreaterThanOrEqual => {
            out.push(Comparator::new(Operator::GreaterThanOrEqual, partial.floor()));
        }
        Operator::GreaterThan => {
            if partial.major.is_none() {
                return Err(ParseError::InvalidConstraint(token.to_string()));
            }
            // `>1.2` admits nothing below the next minor
            out.push(Comparator::new(Operator::GreaterThanOrEqual, partial.ceiling()));
        }
        Operator::LessThan => {
            out.push(Comparator::new(Operator::LessThan, partial.floor()));
        }
        Operator::LessThanOrEqual => {
            if partial.major.is_none() {
                return Err(ParseError::InvalidConstraint(token.to_string()));
            }
            // `<=1.2` admits every 1.2.x
            out.push(Comparator::new(Operator::LessThan, partial.ceiling()));
        }
        Operator::NotEqual => {
            // `!=` over a slice of versions is disjunctive and unsupported
            return Err(ParseError::InvalidConstraint(token.to_string()));
        }
    }
    Ok(())
}

/// An exclusive upper bound derived from a prerelease lower bound gets a `-0`
/// sentinel, so prerelease versions inside the range still pass the
/// prerelease gate of the upper comparator.
fn gate_upper(mut upper: Version, lower: &Version) -> Version {
    if lower.is_prerelease() {
        upper.pre = vec![PreId::Numeric(0)];
    }
    upper
}

fn expand_tilde(partial: Partial, out: &mut Vec<Comparator>) {
    let lower = partial.floor();
    let upper = match (partial.major, partial.minor) {
        (Some(major), None) => Version::new(major + 1, 0, 0),
        (Some(major), Some(minor)) => Version::new(major, minor + 1, 0),
        (None, _) => Version::new(u64::MAX, 0, 0),
    };
    out.push(Comparator::new(Operator::LessThan, gate_upper(upper, &lower)));
    out.push(Comparator::new(Operator::GreaterThanOrEqual, lower));
}

fn expand_caret(partial: Partial, out: &mut Vec<Comparator>) {
    let lower = partial.floor();
    let upper = match (partial.major, partial.minor, partial.patch) {
        (Some(0), Some(0), Some(patch)) => Version::new(0, 0, patch + 1),
        (Some(0), Some(minor), Some(_)) => Version::new(0, minor + 1, 0),
        (Some(0), Some(minor), None) => Version::new(0, minor + 1, 0),
        (Some(major), _, _) => Version::new(major + 1, 0, 0),
        (None, _, _) => Version::new(u64::MAX, 0, 0),
    };
    out.push(Comparator::new(Operator::LessThan, gate_upper(upper, &lower)));
    out.push(Comparator::new(Operator::GreaterThanOrEqual, lower));
}

fn expand_hyphen(from: &str, to: &str, out: &mut Vec<Comparator>) -> Result<(), ParseError> {
    let from = parse_partial(from)?;
    let to = parse_partial(to)?;

    let lower = from.floor();
    if to.is_full() {
        out.push(Comparator::new(Operator::LessThanOrEqual, to.floor()));
    } else {
        out.push(Comparator::new(Operator::LessThan, gate_upper(to.ceiling(), &lower)));
    }
    out.push(Comparator::new(Operator::GreaterThanOrEqual, lower));
    Ok(())
}
