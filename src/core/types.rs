//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA) as returned by the Git Data API
//! - [`RefName`] - Validated Git reference name
//! - [`UtcTimestamp`] - RFC3339 timestamp, ordered
//!
//! # Validation
//!
//! These types enforce validity at construction time. A SHA that came back
//! from the remote API malformed is rejected before it can be fed into the
//! next publish step.
//!
//! # Examples
//!
//! ```
//! use quarto_press::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("main").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/main");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! # let _ = oid;
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),
}

/// Characters git refuses anywhere in a ref or branch name.
const INVALID_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Rules shared by branch names and full ref names.
fn check_ref_format(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err("name cannot start or end with '/'".into());
    }
    if name.ends_with(".lock") {
        return Err("name cannot end with '.lock'".into());
    }
    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Err(format!("name cannot contain '{bad}'"));
        }
    }
    for c in INVALID_REF_CHARS {
        if name.contains(c) {
            return Err(format!("name cannot contain '{c}'"));
        }
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err("name cannot contain control characters".into());
    }
    for component in name.split('/') {
        if component.starts_with('.') {
            return Err("path component cannot start with '.'".into());
        }
        if component.ends_with(".lock") {
            return Err("path component cannot end with '.lock'".into());
        }
    }
    Ok(())
}

/// A validated Git branch name.
///
/// Follows `git check-ref-format` rules; additionally cannot start with
/// `-` and cannot be exactly `@`.
///
/// ```
/// use quarto_press::core::types::BranchName;
///
/// assert_eq!(BranchName::new("main").unwrap().as_str(), "main");
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("@").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name == "@" {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        check_ref_format(&name).map_err(TypeError::InvalidBranchName)?;
        Ok(Self(name))
    }

    /// The default publishing branch.
    pub fn main() -> Self {
        Self("main".to_string())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase.
///
/// ```
/// use quarto_press::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name (e.g. `refs/heads/main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules
    /// or does not live under `refs/`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_ref_format(&name).map_err(TypeError::InvalidRefName)?;
        if !name.starts_with("refs/") {
            return Err(TypeError::InvalidRefName(
                "ref name must start with 'refs/'".into(),
            ));
        }
        Ok(Self(name))
    }

    /// Create a ref name for a branch (`refs/heads/<branch>`).
    ///
    /// ```
    /// use quarto_press::core::types::{BranchName, RefName};
    ///
    /// let refname = RefName::for_branch(&BranchName::main());
    /// assert_eq!(refname.as_str(), "refs/heads/main");
    /// assert_eq!(refname.short(), "heads/main");
    /// ```
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// The ref without its `refs/` prefix, as used in Git Data API paths.
    pub fn short(&self) -> &str {
        self.0.strip_prefix("refs/").unwrap_or(&self.0)
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp, serialized as RFC3339.
///
/// Ordered so that aggregation windows can compare record timestamps
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// The Unix epoch, used when no earlier digest exists.
    pub fn epoch() -> Self {
        Self(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
