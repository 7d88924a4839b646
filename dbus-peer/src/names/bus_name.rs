use std::fmt;
use std::ops::Deref;

use super::{validate_bus_name, NameError};

/// A validated D-Bus bus name, either unique (`:1.42`) or well-known
/// (`org.freedesktop.DBus`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusName(String);

impl BusName {
    /// Validate and construct a bus name.
    pub fn new<S>(name: S) -> Result<Self, NameError>
    where
        S: Into<String>,
    {
        let name = name.into();

        if !validate_bus_name(&name) {
            return Err(NameError::new("bus name"));
        }

        Ok(Self(name))
    }

    /// Test whether this is a unique name, i.e. one assigned by the bus
    /// daemon rather than requested by a client.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.0.starts_with(':')
    }

    /// Borrow the bus name as a `str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for BusName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for BusName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq<str> for BusName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
