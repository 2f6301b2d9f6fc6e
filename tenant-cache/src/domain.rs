use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::fmt;
use uuid::Uuid;

/// Literal written into a key segment for an absent value.
pub const NULL_SEGMENT: &str = "null";

/// Separator between key segments.
pub const SEGMENT_SEPARATOR: char = ':';

fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidKey(format!("{} must not be empty", kind)));
    }
    if value.contains(SEGMENT_SEPARATOR) || value.contains('*') {
        return Err(Error::InvalidKey(format!(
            "{} '{}' must not contain ':' or '*'",
            kind, value
        )));
    }
    Ok(())
}

/// Tenant identifier embedded in every cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(String);

impl OrgId {
    /// Validate and wrap an organization id, keeping its case.
    ///
    /// Ids that differ only in case (`OrgA`, `orga`) get distinct keys, so
    /// their cached data never mixes. Invalidation patterns match without
    /// regard to case, so a write in one also clears the other's entries.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_segment("organization id", &id)?;
        Ok(Self(id))
    }

    /// Sentinel for system-wide entities (menus and the like): the nil UUID.
    pub fn system() -> Self {
        Self(Uuid::nil().to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == Uuid::nil().to_string()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Uuid> for OrgId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercased entity name, the first segment of every key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = name.as_ref().trim().to_lowercase();
        validate_segment("entity type", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyOperation {
    List,
    Dropdown,
    Stats,
    Detail,
}

impl KeyOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOperation::List => "list",
            KeyOperation::Dropdown => "dropdown",
            KeyOperation::Stats => "stats",
            KeyOperation::Detail => "detail",
        }
    }
}

impl fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built cache key: `{entityType}:{operation}:{organizationId}[:{params}...]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Start a key from its three fixed segments.
    pub(crate) fn scoped(entity: &EntityType, operation: KeyOperation, org: &OrgId) -> Self {
        Self(format!(
            "{}{sep}{}{sep}{}",
            entity,
            operation,
            org,
            sep = SEGMENT_SEPARATOR
        ))
    }

    /// Append one positional segment, writing `null` when absent.
    pub(crate) fn push(&mut self, segment: Option<&dyn fmt::Display>) {
        use fmt::Write;

        self.0.push(SEGMENT_SEPARATOR);
        match segment {
            // Writing into a String cannot fail.
            Some(value) => {
                let _ = write!(self.0, "{}", value);
            }
            None => self.0.push_str(NULL_SEGMENT),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Positional parameters of a paged list query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListQuery<'a> {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<&'a str>,
    pub sort_field: Option<&'a str>,
    pub sort_direction: Option<&'a str>,
}

impl<'a> ListQuery<'a> {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn search(mut self, search: &'a str) -> Self {
        self.search = Some(search);
        self
    }

    pub fn sort(mut self, field: &'a str, direction: &'a str) -> Self {
        self.sort_field = Some(field);
        self.sort_direction = Some(direction);
        self
    }
}
