//! Strict semantic version parsing and precedence comparison.

use std::cmp::Ordering;
use std::fmt;

use crate::ParseError;

/// A single prerelease identifier.
///
/// Numeric identifiers compare numerically and sort below alphanumeric
/// identifiers, per SemVer precedence rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreId {
    Numeric(u64),
    AlphaNumeric(String),
}

impl PreId {
    fn parse(s: &str) -> Result<Self, ()> {
        if s.is_empty() {
            return Err(());
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(());
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if s.len() > 1 && s.starts_with('0') {
                // leading zeros are not allowed on numeric identifiers
                return Err(());
            }
            return s.parse().map(PreId::Numeric).map_err(|_| ());
        }
        Ok(PreId::AlphaNumeric(s.to_string()))
    }
}

impl Ord for PreId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PreId::Numeric(a), PreId::Numeric(b)) => a.cmp(b),
            (PreId::Numeric(_), PreId::AlphaNumeric(_)) => Ordering::Less,
            (PreId::AlphaNumeric(_), PreId::Numeric(_)) => Ordering::Greater,
            (PreId::AlphaNumeric(a), PreId::AlphaNumeric(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PreId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreId::Numeric(n) => write!(f, "{}", n),
            PreId::AlphaNumeric(s) => write!(f, "{}", s),
        }
    }
}

/// A parsed semantic version.
///
/// Ordering and equality follow SemVer precedence: the numeric triple, then
/// prerelease identifiers (a version without prerelease sorts higher than one
/// with). Build metadata is carried but ignored for comparison, so
/// `0.8.0+0.1634606167.p` compares equal to `0.8.0`.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<PreId>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version { major, minor, patch, pre: Vec::new(), build: None }
    }

    /// Parse a version in strict form: `MAJOR.MINOR.PATCH[-PRE][+BUILD]`.
    ///
    /// No `v` prefix, no missing parts, no leading zeros on numeric parts.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidVersion(input.to_string());

        let (core, build) = match input.split_once('+') {
            Some((core, build)) => {
                if build.is_empty() || !build.split('.').all(is_build_identifier) {
                    return Err(invalid());
                }
                (core, Some(build.to_string()))
            }
            None => (input, None),
        };

        let (triple, pre_part) = match core.split_once('-') {
            Some((triple, pre)) => (triple, Some(pre)),
            None => (core, None),
        };

        let mut parts = triple.split('.');
        let major = parse_numeric_part(parts.next()).ok_or_else(invalid)?;
        let minor = parse_numeric_part(parts.next()).ok_or_else(invalid)?;
        let patch = parse_numeric_part(parts.next()).ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let pre = match pre_part {
            Some(pre) => pre
                .split('.')
                .map(PreId::parse)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?,
            None => Vec::new(),
        };

        Ok(Version { major, minor, patch, pre, build })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

fn parse_numeric_part(part: Option<&str>) -> Option<u64> {
    let part = part?;
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

fn is_build_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.patch.cmp(&other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let ids: Vec<String> = self.pre.iter().map(|p| p.to_string()).collect();
            write!(f, "-{}", ids.join("."))?;
        }
        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let version = v("1.2.3");
        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 2);
        assert_eq!(version.patch, 3);
        assert!(version.pre.is_empty());
        assert!(version.build.is_none());
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let version = v("1.42.0-5+0.1687199951.p");
        assert_eq!(version.pre, vec![PreId::Numeric(5)]);
        assert_eq!(version.build.as_deref(), Some("0.1687199951.p"));

        let version = v("0.10.0-mas");
        assert_eq!(version.pre, vec![PreId::AlphaNumeric("mas".to_string())]);

        let version = v("1.0.0-alpha.1.x-y");
        assert_eq!(
            version.pre,
            vec![
                PreId::AlphaNumeric("alpha".to_string()),
                PreId::Numeric(1),
                PreId::AlphaNumeric("x-y".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_loose_forms() {
        for s in [
            "", "1", "1.2", "v1.2.3", "1.2.3.4", "01.2.3", "1.02.3", "1.2.3-",
            "1.2.3-01", "1.2.3+", "1.2.3-alpha..1", "1.2.3 ", "1.2.x",
        ] {
            assert!(Version::parse(s).is_err(), "expected {:?} to be rejected", s);
        }
    }

    #[test]
    fn test_precedence() {
        assert!(v("1.0.0") < v("2.0.0"));
        assert!(v("2.0.0") < v("2.1.0"));
        assert!(v("2.1.0") < v("2.1.1"));
        // prerelease sorts below the release
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.11"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
        assert!(v("1.42.0-5") < v("1.47.1-5"));
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(v("0.8.0+0.1634606167.p"), v("0.8.0"));
        assert_eq!(v("0.8.3+0.1645735250.p"), v("0.8.3+0.1649688682.p"));
        assert!(v("0.8.3+0.1645735250.p") <= v("0.8.3"));
        assert!(v("1.42.0-5+0.1687199951.p") == v("1.42.0-5"));
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["1.2.3", "0.10.0-mas", "1.42.0-5+0.1687199951.p", "0.8.3+0.1645735250.p"] {
            assert_eq!(v(s).to_string(), s);
        }
    }
}
