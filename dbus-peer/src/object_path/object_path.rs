use std::fmt;

use super::{validate, Iter, ObjectPathBuf, ObjectPathError};

/// A validated, borrowed D-Bus object path.
///
/// The following rules define a [valid object path]. Implementations must
/// not send or accept messages with invalid object paths.
///
/// [valid object path]: https://dbus.freedesktop.org/doc/dbus-specification.html#message-protocol-marshaling-object-path
///
/// * The path may be of any length.
/// * The path must begin with an ASCII `/` character, and consists of
///   elements separated by `/`.
/// * Each element must only contain the ASCII characters `[A-Za-z0-9_]`.
/// * No element may be the empty string.
/// * Multiple `/` characters cannot occur in sequence.
/// * A trailing `/` is not allowed unless the path is the root path.
///
/// # Examples
///
/// ```
/// use dbus_peer::object_path::ObjectPath;
///
/// assert!(ObjectPath::new("/org/freedesktop/DBus").is_ok());
/// assert!(ObjectPath::new("/org//DBus").is_err());
/// assert!(ObjectPath::new("").is_err());
/// ```
#[derive(PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectPath(str);

impl ObjectPath {
    /// The root object path, `/`.
    pub const ROOT: &'static ObjectPath = ObjectPath::new_const("/");

    /// Construct an object path in a constant context. Panics if invalid.
    #[track_caller]
    pub const fn new_const(path: &str) -> &ObjectPath {
        if !validate(path.as_bytes()) {
            panic!("invalid D-Bus object path");
        }

        unsafe { Self::new_unchecked(path) }
    }

    /// Try to construct a borrowed object path, validating it first.
    pub fn new<P>(path: &P) -> Result<&ObjectPath, ObjectPathError>
    where
        P: ?Sized + AsRef<str>,
    {
        let path = path.as_ref();

        if !validate(path.as_bytes()) {
            return Err(ObjectPathError);
        }

        Ok(unsafe { Self::new_unchecked(path) })
    }

    /// Construct an object path without validating it.
    ///
    /// # Safety
    ///
    /// The caller must ensure `path` is a valid D-Bus object path.
    #[inline]
    pub const unsafe fn new_unchecked(path: &str) -> &Self {
        &*(path as *const str as *const ObjectPath)
    }

    /// Iterate over the elements of this path.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.0)
    }

    /// Test whether `self` is a prefix of `other` in path-element terms.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_peer::object_path::ObjectPath;
    ///
    /// const FOO: &ObjectPath = ObjectPath::new_const("/foo");
    /// const FOO_BAR: &ObjectPath = ObjectPath::new_const("/foo/bar");
    ///
    /// assert!(FOO_BAR.starts_with(FOO));
    /// ```
    #[must_use]
    pub fn starts_with(&self, other: &ObjectPath) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Borrow the object path as a `str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<ObjectPath> for ObjectPath {
    #[inline]
    fn as_ref(&self) -> &ObjectPath {
        self
    }
}

impl ToOwned for ObjectPath {
    type Owned = ObjectPathBuf;

    #[inline]
    fn to_owned(&self) -> Self::Owned {
        unsafe { ObjectPathBuf::from_string_unchecked(self.0.to_owned()) }
    }
}

impl<'a> IntoIterator for &'a ObjectPath {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq<str> for ObjectPath {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&str> for ObjectPath {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0 == **other
    }
}
