use std::error;
use std::fmt;

/// An error raised when a dotted D-Bus name fails validation.
#[derive(Debug)]
#[non_exhaustive]
pub struct NameError {
    what: &'static str,
}

impl NameError {
    pub(super) fn new(what: &'static str) -> Self {
        Self { what }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}", self.what)
    }
}

impl error::Error for NameError {}
