use std::fmt;
use std::ops::Deref;

use super::{validate_member_name, NameError};

/// A validated D-Bus member name: a method, signal, or property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberName(String);

impl MemberName {
    /// Validate and construct a member name.
    pub fn new<S>(name: S) -> Result<Self, NameError>
    where
        S: Into<String>,
    {
        let name = name.into();

        if !validate_member_name(&name) {
            return Err(NameError::new("member name"));
        }

        Ok(Self(name))
    }

    /// Borrow the member name as a `str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for MemberName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for MemberName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq<str> for MemberName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
