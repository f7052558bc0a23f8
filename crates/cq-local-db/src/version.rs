//! Schema version tokens.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A schema version as recorded in `app_info`.
///
/// Versions are opaque strings such as `"1.0"`. They order by their
/// dot-separated components, numerically where both components are numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Schema shipped before version tracking existed.
    pub const LEGACY: &'static str = "0.0";
    /// First tracked schema.
    pub const V1: &'static str = "1.0";

    pub fn new<S: Into<String>>(version: S) -> Self {
        Self(version.into())
    }

    pub fn legacy() -> Self {
        Self::new(Self::LEGACY)
    }

    pub fn v1() -> Self {
        Self::new(Self::V1)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut lhs = self.0.split('.');
        let mut rhs = other.0.split('.');
        loop {
            match (lhs.next(), rhs.next()) {
                (None, None) => return self.0.cmp(&other.0),
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(a), Some(b)) => {
                    let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(a), Ok(b)) => a.cmp(&b),
                        _ => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
        }
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Render an optional version, using `scratch` for an empty store.
pub fn describe(version: Option<&SchemaVersion>) -> String {
    version.map_or_else(|| "scratch".to_string(), ToString::to_string)
}
