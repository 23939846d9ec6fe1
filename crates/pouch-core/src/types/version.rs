//! Semantic versions and npm-style version ranges.
//!
//! `Version` follows semver precedence rules. `VersionReq` understands the
//! range grammar used in `package.json` manifests: `||` unions,
//! whitespace-separated intersections, hyphen ranges, x-ranges, tilde and
//! caret. Every range is lowered into plain comparators at parse time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version range: satisfied when any of its comparator sets is satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    pub sets: Vec<ComparatorSet>,
}

/// Intersection of comparators (`>=1.2.3 <2.0.0-0`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparatorSet {
    pub comparators: Vec<Comparator>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Primitive comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
}

/// Partial version as written in a range; `None` marks an x-range component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },

    #[error("Invalid version range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },
}

/// Operator as written in a range, before lowering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Tilde,
    Caret,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// `major.minor.patch-0`, the lowest version with this release tuple
    fn lowest_of(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            prerelease: Some("0".to_string()),
            ..Self::new(major, minor, patch)
        }
    }

    fn same_release(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers: numeric identifiers compare
/// numerically and sort below alphanumeric ones
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (numeric_identifier(x), numeric_identifier(y)) {
                    (Some(l), Some(r)) => l.cmp(&r),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }
}

fn numeric_identifier(ident: &str) -> Option<u64> {
    if !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit()) {
        ident.parse().ok()
    } else {
        None
    }
}

fn valid_identifiers(input: &str) -> bool {
    !input.is_empty()
        && input.split('.').all(|ident| {
            !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            component: component.to_string(),
        });
    }
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

/// Drop a leading `=` and `v`, both of which npm tolerates
fn strip_loose_prefix(input: &str) -> &str {
    let input = input.trim();
    let input = input.strip_prefix('=').unwrap_or(input).trim_start();
    input
        .strip_prefix('v')
        .or_else(|| input.strip_prefix('V'))
        .unwrap_or(input)
}

/// Split `core-prerelease+build` into its three parts
fn split_version(input: &str) -> Result<(&str, Option<String>, Option<String>), VersionError> {
    let (version_part, build) = match input.split_once('+') {
        Some((v, b)) => {
            if !valid_identifiers(b) {
                return Err(VersionError::InvalidBuild {
                    build: b.to_string(),
                });
            }
            (v, Some(b.to_string()))
        },
        None => (input, None),
    };

    let (core_part, prerelease) = match version_part.split_once('-') {
        Some((c, p)) => {
            if !valid_identifiers(p) {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: p.to_string(),
                });
            }
            (c, Some(p.to_string()))
        },
        None => (version_part, None),
    };

    Ok((core_part, prerelease, build))
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = strip_loose_prefix(s);
        let (core_part, prerelease, build) = split_version(input)?;

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: s.trim().to_string(),
            });
        }

        Ok(Version {
            major: parse_number(parts[0])?,
            minor: parse_number(parts[1])?,
            patch: parse_number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl PartialVersion {
    /// Parse `1`, `1.2`, `1.x`, `1.2.*`, `*` or a full version
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let stripped = strip_loose_prefix(input);
        if stripped.is_empty() {
            return Ok(Self::any());
        }

        let (core_part, prerelease, _build) = split_version(stripped)?;
        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::InvalidFormat {
                input: input.trim().to_string(),
            });
        }

        let mut numbers = [None; 3];
        for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
            if matches!(*part, "x" | "X" | "*") {
                break;
            }
            *slot = Some(parse_number(part)?);
        }

        let complete = numbers.iter().all(Option::is_some);
        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            prerelease: if complete { prerelease } else { None },
        })
    }

    fn any() -> Self {
        Self {
            major: None,
            minor: None,
            patch: None,
            prerelease: None,
        }
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let ord = version.cmp(&self.version);
        match self.op {
            Op::Exact => ord == Ordering::Equal,
            Op::Greater => ord == Ordering::Greater,
            Op::GreaterEq => ord != Ordering::Less,
            Op::Less => ord == Ordering::Less,
            Op::LessEq => ord != Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        };
        write!(f, "{}{}", op, self.version)
    }
}

impl ComparatorSet {
    /// A prerelease version only matches when some comparator names a
    /// prerelease of the same `major.minor.patch`
    pub fn matches(&self, version: &Version) -> bool {
        if !self.comparators.iter().all(|comp| comp.matches(version)) {
            return false;
        }

        if version.is_prerelease() {
            return self
                .comparators
                .iter()
                .any(|comp| comp.version.is_prerelease() && comp.version.same_release(version));
        }

        true
    }

    fn parse(input: &str) -> Result<Self, VersionError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();

        if tokens.len() == 3 && tokens[1] == "-" {
            let mut comparators = lower(RangeOp::Gte, PartialVersion::parse(tokens[0])?);
            comparators.extend(lower(RangeOp::Lte, PartialVersion::parse(tokens[2])?));
            return Ok(Self { comparators });
        }

        let mut comparators = Vec::new();
        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            // `>= 1.2.3` is accepted with a space after the operator
            let joined;
            let token = if is_bare_operator(token) {
                let next = iter.next().ok_or_else(|| VersionError::InvalidRange {
                    input: input.trim().to_string(),
                    reason: format!("operator '{}' has no version", token),
                })?;
                joined = format!("{}{}", token, next);
                joined.as_str()
            } else {
                token
            };

            let (op, rest) = split_operator(token);
            comparators.extend(lower(op, PartialVersion::parse(rest)?));
        }

        Ok(Self { comparators })
    }
}

fn is_bare_operator(token: &str) -> bool {
    matches!(token, "<" | "<=" | ">" | ">=" | "=" | "~" | "~>" | "^")
}

fn split_operator(token: &str) -> (RangeOp, &str) {
    const PREFIXES: [(&str, RangeOp); 8] = [
        (">=", RangeOp::Gte),
        ("<=", RangeOp::Lte),
        ("~>", RangeOp::Tilde),
        (">", RangeOp::Gt),
        ("<", RangeOp::Lt),
        ("=", RangeOp::Eq),
        ("~", RangeOp::Tilde),
        ("^", RangeOp::Caret),
    ];

    for (prefix, op) in PREFIXES {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (RangeOp::Eq, token)
}

fn gte(version: Version) -> Comparator {
    Comparator::new(Op::GreaterEq, version)
}

fn lt(version: Version) -> Comparator {
    Comparator::new(Op::Less, version)
}

/// Matches nothing: no version sorts below `0.0.0-0`
fn nothing() -> Vec<Comparator> {
    vec![lt(Version::lowest_of(0, 0, 0))]
}

/// Lower one written comparator into primitive comparators
fn lower(op: RangeOp, partial: PartialVersion) -> Vec<Comparator> {
    let PartialVersion {
        major,
        minor,
        patch,
        ..
    } = partial;

    let Some(major) = major else {
        return match op {
            RangeOp::Gt | RangeOp::Lt => nothing(),
            _ => Vec::new(),
        };
    };

    match op {
        RangeOp::Eq => match (minor, patch) {
            (None, _) => vec![
                gte(Version::new(major, 0, 0)),
                lt(Version::lowest_of(major + 1, 0, 0)),
            ],
            (Some(minor), None) => vec![
                gte(Version::new(major, minor, 0)),
                lt(Version::lowest_of(major, minor + 1, 0)),
            ],
            (Some(_), Some(_)) => vec![Comparator::new(Op::Exact, partial.to_version())],
        },
        RangeOp::Tilde => match (minor, patch) {
            (None, _) => vec![
                gte(Version::new(major, 0, 0)),
                lt(Version::lowest_of(major + 1, 0, 0)),
            ],
            (Some(minor), _) => vec![
                gte(partial.to_version()),
                lt(Version::lowest_of(major, minor + 1, 0)),
            ],
        },
        RangeOp::Caret => {
            let upper = match (major, minor, patch) {
                (0, Some(0), Some(patch)) => Version::lowest_of(0, 0, patch + 1),
                (0, Some(minor), _) => Version::lowest_of(0, minor + 1, 0),
                (major, _, _) => Version::lowest_of(major + 1, 0, 0),
            };
            vec![gte(partial.to_version()), lt(upper)]
        },
        RangeOp::Gt => match (minor, patch) {
            (None, _) => vec![gte(Version::new(major + 1, 0, 0))],
            (Some(minor), None) => vec![gte(Version::new(major, minor + 1, 0))],
            (Some(_), Some(_)) => vec![Comparator::new(Op::Greater, partial.to_version())],
        },
        RangeOp::Gte => vec![gte(partial.to_version())],
        RangeOp::Lt => match (minor, patch) {
            (None, _) => vec![lt(Version::lowest_of(major, 0, 0))],
            (Some(minor), None) => vec![lt(Version::lowest_of(major, minor, 0))],
            (Some(_), Some(_)) => vec![lt(partial.to_version())],
        },
        RangeOp::Lte => match (minor, patch) {
            (None, _) => vec![lt(Version::lowest_of(major + 1, 0, 0))],
            (Some(minor), None) => vec![lt(Version::lowest_of(major, minor + 1, 0))],
            (Some(_), Some(_)) => vec![Comparator::new(Op::LessEq, partial.to_version())],
        },
    }
}

impl VersionReq {
    /// Range that matches every non-prerelease version
    pub fn any() -> Self {
        Self {
            sets: vec![ComparatorSet::default()],
        }
    }

    /// Parse an npm version range
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let sets = input
            .split("||")
            .map(ComparatorSet::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| match e {
                VersionError::InvalidRange { .. } => e,
                other => VersionError::InvalidRange {
                    input: input.trim().to_string(),
                    reason: other.to_string(),
                },
            })?;

        Ok(Self { sets })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }

    /// The pinned version when the range is a single `=x.y.z`
    pub fn exact_version(&self) -> Option<&Version> {
        match self.sets.as_slice() {
            [set] => match set.comparators.as_slice() {
                [Comparator {
                    op: Op::Exact,
                    version,
                }] => Some(version),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, set) in self.sets.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            if set.comparators.is_empty() {
                write!(f, "*")?;
            }
            for (j, comp) in set.comparators.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", comp)?;
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            prerelease in prop::option::of("[a-zA-Z0-9-]{1,8}(\\.[a-zA-Z0-9-]{1,8}){0,2}"),
            build in prop::option::of("[a-zA-Z0-9-]{1,8}(\\.[a-zA-Z0-9-]{1,8}){0,2}")
        ) {
            let original = Version {
                major,
                minor,
                patch,
                prerelease: prerelease.clone(),
                build: build.clone(),
            };

            let parsed = Version::from_str(&original.to_string()).unwrap();
            prop_assert_eq!(parsed, original);
        }
    }

    proptest! {
        #[test]
        fn caret_matches_same_major_at_or_above_base(
            major in 1u64..50,
            minor in 0u64..50,
            patch in 0u64..50,
            c_minor in 0u64..50,
            c_patch in 0u64..50,
        ) {
            let req = VersionReq::parse(&format!("^{}.{}.{}", major, minor, patch)).unwrap();
            let base = Version::new(major, minor, patch);
            let candidate = Version::new(major, c_minor, c_patch);
            prop_assert_eq!(req.matches(&candidate), candidate >= base);
            prop_assert!(!req.matches(&Version::new(major + 1, 0, 0)));
        }
    }

    proptest! {
        #[test]
        fn version_comparison_transitivity(
            a in (0u64..20, 0u64..20, 0u64..20),
            b in (0u64..20, 0u64..20, 0u64..20),
            c in (0u64..20, 0u64..20, 0u64..20),
        ) {
            let a = Version::new(a.0, a.1, a.2);
            let b = Version::new(b.0, b.1, b.2);
            let c = Version::new(c.0, c.1, c.2);

            if a < b && b < c {
                prop_assert!(a < c, "Transitivity violated: {} < {} < {}", a, b, c);
            }
        }
    }
}
