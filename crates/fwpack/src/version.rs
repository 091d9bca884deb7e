//! Semantic version triples and their bump rules.

use crate::{PackageError, PackageResult};
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

/// Which component of a [`SemanticVersion`] to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl SemanticVersion {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `X.Y.Z` where each component is a non-negative decimal integer.
    pub fn parse(text: &str) -> PackageResult<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 3 {
            return Err(malformed(
                text,
                format!("expected 3 components, found {}", parts.len()),
            ));
        }

        let major = parse_component(text, parts[0])?;
        let minor = parse_component(text, parts[1])?;
        let patch = parse_component(text, parts[2])?;

        Ok(Self::new(major, minor, patch))
    }

    /// Return the version that follows this one for the given bump kind.
    ///
    /// Fails with [`PackageError::MalformedVersion`] when the bumped component
    /// is already `u64::MAX`.
    pub fn bump(self, kind: BumpKind) -> PackageResult<Self> {
        let next = match kind {
            BumpKind::Major => increment(self.major).map(|major| Self::new(major, 0, 0)),
            BumpKind::Minor => increment(self.minor).map(|minor| Self::new(self.major, minor, 0)),
            BumpKind::Patch => {
                increment(self.patch).map(|patch| Self::new(self.major, self.minor, patch))
            }
        };

        next.ok_or_else(|| {
            malformed(
                &self.to_string(),
                format!("{kind} component overflows when bumped"),
            )
        })
    }
}

fn increment(component: u64) -> Option<u64> {
    component.checked_add(1)
}

fn parse_component(text: &str, component: &str) -> PackageResult<u64> {
    // u64::from_str accepts a leading '+', which is not part of the X.Y.Z form
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(
            text,
            format!("component '{component}' is not a non-negative integer"),
        ));
    }

    component
        .parse()
        .map_err(|e| malformed(text, format!("component '{component}': {e}")))
}

fn malformed(text: &str, reason: String) -> PackageError {
    PackageError::MalformedVersion {
        value: text.to_string(),
        reason,
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemanticVersion {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl BumpKind {
    /// Parse a bump selector, ignoring ASCII case.
    pub fn parse(s: &str) -> PackageResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(PackageError::InvalidBumpKind(s.to_string())),
        }
    }

    /// Get the selector string (e.g., "minor").
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl FromStr for BumpKind {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
