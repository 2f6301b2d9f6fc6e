use crate::domain::CacheKey;
use shared::{Error, Result};
use std::fmt;

/// Selects a set of cache keys for bulk removal.
///
/// Parsed once from the textual form used by callers:
/// - no `*`: a prefix, `users:stats:org1` behaves as `users:stats:org1*`
///   (so it also matches `users:stats:org10`),
/// - exactly one `*`: a prefix and a suffix around the wildcard.
///
/// More than one `*` is rejected rather than guessed at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationPattern {
    Exact(String),
    Prefix(String),
    PrefixSuffix(String, String),
}

impl InvalidationPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::InvalidPattern("pattern must not be empty".to_string()));
        }

        let mut parts = pattern.splitn(3, '*');
        let prefix = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(Self::Prefix(prefix.to_string())),
            (Some(suffix), None) => Ok(Self::PrefixSuffix(prefix.to_string(), suffix.to_string())),
            (Some(_), Some(_)) => Err(Error::InvalidPattern(format!(
                "'{}' contains more than one wildcard",
                pattern
            ))),
        }
    }

    pub fn exact(key: &CacheKey) -> Self {
        Self::Exact(key.as_str().to_string())
    }

    /// Case-insensitive match of a concrete key.
    pub fn matches(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        match self {
            Self::Exact(exact) => key == exact.to_lowercase(),
            Self::Prefix(prefix) => key.starts_with(&prefix.to_lowercase()),
            Self::PrefixSuffix(prefix, suffix) => {
                let prefix = prefix.to_lowercase();
                let suffix = suffix.to_lowercase();
                key.len() >= prefix.len() + suffix.len()
                    && key.starts_with(&prefix)
                    && key.ends_with(&suffix)
            }
        }
    }

    /// Store-side glob with the literal parts escaped.
    pub fn to_glob(&self) -> String {
        match self {
            Self::Exact(exact) => escape_glob(exact),
            Self::Prefix(prefix) => format!("{}*", escape_glob(prefix)),
            Self::PrefixSuffix(prefix, suffix) => {
                format!("{}*{}", escape_glob(prefix), escape_glob(suffix))
            }
        }
    }
}

impl fmt::Display for InvalidationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(exact) => f.write_str(exact),
            Self::Prefix(prefix) => f.write_str(prefix),
            Self::PrefixSuffix(prefix, suffix) => write!(f, "{}*{}", prefix, suffix),
        }
    }
}

impl std::str::FromStr for InvalidationPattern {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Self> {
        Self::parse(pattern)
    }
}

fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
