use std::fmt;
use std::ops::Deref;

use super::{validate_interface_name, NameError};

/// A validated D-Bus error name, e.g. `org.freedesktop.DBus.Error.Failed`.
///
/// Error names share the interface name grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorName(String);

impl ErrorName {
    /// Validate and construct an error name.
    pub fn new<S>(name: S) -> Result<Self, NameError>
    where
        S: Into<String>,
    {
        let name = name.into();

        if !validate_interface_name(&name) {
            return Err(NameError::new("error name"));
        }

        Ok(Self(name))
    }

    /// Borrow the error name as a `str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrorName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for ErrorName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
