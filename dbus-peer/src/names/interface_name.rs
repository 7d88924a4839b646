use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use super::{validate_interface_name, NameError};

/// A validated D-Bus interface name, e.g. `org.freedesktop.DBus.Properties`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceName(String);

impl InterfaceName {
    /// Validate and construct an interface name.
    pub fn new<S>(name: S) -> Result<Self, NameError>
    where
        S: Into<String>,
    {
        let name = name.into();

        if !validate_interface_name(&name) {
            return Err(NameError::new("interface name"));
        }

        Ok(Self(name))
    }

    /// Borrow the interface name as a `str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for InterfaceName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for InterfaceName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq<str> for InterfaceName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
