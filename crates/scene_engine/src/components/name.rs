//! Name tag component

use std::fmt;

use crate::scene::Component;

/// Human-readable tag used by name queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Component for Name {}

impl Name {
    /// Create a name tag
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The tag text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
