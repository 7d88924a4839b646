use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use super::{validate, ObjectPath, ObjectPathError};

/// An owned, validated D-Bus object path.
///
/// The owned counterpart to [`ObjectPath`], the same way `String` relates
/// to `str`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectPathBuf {
    data: String,
}

impl ObjectPathBuf {
    /// Try to construct an owned object path, validating it first.
    pub fn new<S>(path: S) -> Result<Self, ObjectPathError>
    where
        S: Into<String>,
    {
        let data = path.into();

        if !validate(data.as_bytes()) {
            return Err(ObjectPathError);
        }

        Ok(Self { data })
    }

    /// Construct an owned object path without validating it.
    ///
    /// # Safety
    ///
    /// The caller must ensure `data` is a valid D-Bus object path.
    #[inline]
    pub unsafe fn from_string_unchecked(data: String) -> Self {
        Self { data }
    }

    /// Append a single path element, validating that it contains only the
    /// characters allowed in an object path element.
    pub fn push(&mut self, element: &str) -> Result<(), ObjectPathError> {
        if element.is_empty()
            || !element
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return Err(ObjectPathError);
        }

        if self.data != "/" {
            self.data.push('/');
        }

        self.data.push_str(element);
        Ok(())
    }

    /// Coerce into a borrowed [`ObjectPath`].
    #[inline]
    pub fn as_object_path(&self) -> &ObjectPath {
        unsafe { ObjectPath::new_unchecked(&self.data) }
    }

    /// Consume and return the inner `String`.
    #[inline]
    pub fn into_string(self) -> String {
        self.data
    }
}

impl Deref for ObjectPathBuf {
    type Target = ObjectPath;

    #[inline]
    fn deref(&self) -> &ObjectPath {
        self.as_object_path()
    }
}

impl Borrow<ObjectPath> for ObjectPathBuf {
    #[inline]
    fn borrow(&self) -> &ObjectPath {
        self.as_object_path()
    }
}

impl AsRef<ObjectPath> for ObjectPathBuf {
    #[inline]
    fn as_ref(&self) -> &ObjectPath {
        self.as_object_path()
    }
}

impl fmt::Debug for ObjectPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_object_path(), f)
    }
}

impl fmt::Display for ObjectPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_object_path(), f)
    }
}

impl TryFrom<&str> for ObjectPathBuf {
    type Error = ObjectPathError;

    #[inline]
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_owned())
    }
}

impl TryFrom<String> for ObjectPathBuf {
    type Error = ObjectPathError;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Default for ObjectPathBuf {
    #[inline]
    fn default() -> Self {
        ObjectPath::ROOT.to_owned()
    }
}

impl PartialEq<ObjectPath> for ObjectPathBuf {
    #[inline]
    fn eq(&self, other: &ObjectPath) -> bool {
        self.as_object_path() == other
    }
}
