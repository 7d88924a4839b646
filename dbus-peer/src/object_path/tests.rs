use super::{ObjectPath, ObjectPathBuf};

#[test]
fn accepts_valid_paths() {
    assert!(ObjectPath::new("/").is_ok());
    assert!(ObjectPath::new("/org/freedesktop/DBus").is_ok());
    assert!(ObjectPath::new("/a_1/b_2").is_ok());
}

#[test]
fn rejects_invalid_paths() {
    assert!(ObjectPath::new("").is_err());
    assert!(ObjectPath::new("foo").is_err());
    assert!(ObjectPath::new("/foo/").is_err());
    assert!(ObjectPath::new("/foo//bar").is_err());
    assert!(ObjectPath::new("/foo.bar").is_err());
}

#[test]
fn iterates_elements() {
    let path = ObjectPath::new("/org/freedesktop/DBus").unwrap();
    let elements: Vec<_> = path.iter().collect();
    assert_eq!(elements, ["org", "freedesktop", "DBus"]);
}

#[test]
fn iterates_back_to_front() {
    let path = ObjectPath::new("/org/freedesktop/DBus").unwrap();
    let mut it = path.iter();
    assert_eq!(it.next_back(), Some("DBus"));
    assert_eq!(it.next(), Some("org"));
    assert_eq!(it.next(), Some("freedesktop"));
    assert!(it.next().is_none());
}

#[test]
fn starts_with_prefix() {
    let foo = ObjectPath::new("/foo").unwrap();
    let foo_bar = ObjectPath::new("/foo/bar").unwrap();
    assert!(foo_bar.starts_with(foo));
    assert!(!foo.starts_with(foo_bar));
}

#[test]
fn buf_push_builds_path() {
    let mut buf = ObjectPathBuf::default();
    buf.push("org").unwrap();
    buf.push("freedesktop").unwrap();
    assert_eq!(buf.as_str(), "/org/freedesktop");
    assert!(buf.push("bad.name").is_err());
}
