//! Core types shared by the cache, the backend contract and the type system.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Durable node identifier
pub type NodeUuid = uuid::Uuid;

/// Qualified item name in `prefix:local` form (or a bare local name)
///
/// Names are compared by their full qualified string. The wildcard name `*`
/// identifies residual definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(Cow<'static, str>);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Name(Cow::Owned(name.into()))
    }

    pub const fn from_static(name: &'static str) -> Self {
        Name(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace prefix, empty for unprefixed names
    pub fn prefix(&self) -> &str {
        match self.0.split_once(':') {
            Some((prefix, _)) => prefix,
            None => "",
        }
    }

    pub fn local_name(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, local)) => local,
            None => &self.0,
        }
    }

    pub fn is_residual(&self) -> bool {
        self.0 == "*"
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::new(value)
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::new(value)
    }
}
