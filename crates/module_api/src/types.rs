//! # Identifier and Metadata Types
//!
//! Inert value objects shared by the host and its modules.
//!
//! - [`ServerId`] - Stable identifier of one running server instance
//! - [`ContactInformation`] - Authorship record published by module loaders

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a server instance.
///
/// A wrapper around UUID so a server id can never be confused with any other
/// identifier in the system. A new random id is generated for every
/// `CoreServer` and stays the same for its whole life.
///
/// # Examples
///
/// ```rust
/// use module_api::ServerId;
///
/// let id = ServerId::new();
/// let parsed: ServerId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(pub Uuid);

impl ServerId {
    /// Creates a new random server ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for ServerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contact details of somebody who authored a module loader.
///
/// Ordered by name first so loaders can expose their authors as a
/// `BTreeSet` with a stable iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactInformation {
    /// Display name of the author
    pub name: String,
    /// Optional e-mail address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Optional personal or project website
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ContactInformation {
    /// Creates a contact with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            website: None,
        }
    }

    /// Set e-mail
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set website
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }
}

impl std::fmt::Display for ContactInformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(email) = &self.email {
            write!(f, " <{}>", email)?;
        }
        if let Some(website) = &self.website {
            write!(f, " ({})", website)?;
        }
        Ok(())
    }
}
