//! Validators for the dotted-name grammars used throughout D-Bus: bus names,
//! interface names, member (method/signal/property) names and error names.
//!
//! These are plain validating newtypes over `str`, in the same style as
//! [`crate::object_path::ObjectPath`] and [`dbus_peer_core::signature::Signature`],
//! but since none of them are used as DST slices in hot marshalling paths
//! they're kept to an owned `String` wrapper plus a borrowed validation
//! function.

pub use self::error::NameError;
mod error;

pub use self::bus_name::BusName;
mod bus_name;

pub use self::interface_name::InterfaceName;
mod interface_name;

pub use self::member_name::MemberName;
mod member_name;

pub use self::error_name::ErrorName;
mod error_name;

const MAX_NAME: usize = 255;

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_name_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'-'
}

/// Validate a single dot-separated segment of `[A-Za-z_][A-Za-z0-9_]*`, as
/// used by interface, member and error names (unlike bus names, these
/// segments may not start with a digit or contain `-`).
fn validate_member_segment(segment: &[u8]) -> bool {
    match segment.split_first() {
        Some((&first, rest)) => {
            (first.is_ascii_alphabetic() || first == b'_')
                && rest
                    .iter()
                    .all(|&b| b.is_ascii_alphanumeric() || b == b'_')
        }
        None => false,
    }
}

/// Validate a bus name: `:`-prefixed unique names allow any dot-separated
/// run of `[A-Za-z0-9_-]+` segments (with digits allowed to lead each
/// segment); well-known names require at least two segments and the usual
/// name-start rule per segment.
pub(crate) fn validate_bus_name(s: &str) -> bool {
    let bytes = s.as_bytes();

    if bytes.is_empty() || bytes.len() > MAX_NAME {
        return false;
    }

    if let Some(rest) = bytes.strip_prefix(b":") {
        return rest
            .split(|&b| b == b'.')
            .all(|seg| !seg.is_empty() && seg.iter().all(|&b| is_name_char(b)));
    }

    let segments: Vec<&[u8]> = bytes.split(|&b| b == b'.').collect();

    segments.len() >= 2
        && segments.iter().all(|seg| {
            !seg.is_empty()
                && matches!(seg.first(), Some(&b) if is_name_start_char(b))
                && seg.iter().all(|&b| is_name_char(b))
        })
}

/// Validate an interface name: at least two dot-separated segments of
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn validate_interface_name(s: &str) -> bool {
    let bytes = s.as_bytes();

    if bytes.is_empty() || bytes.len() > MAX_NAME {
        return false;
    }

    let segments: Vec<&[u8]> = bytes.split(|&b| b == b'.').collect();
    segments.len() >= 2 && segments.iter().all(|seg| validate_member_segment(seg))
}

/// Validate a member (method/signal/property) name: a single segment of
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn validate_member_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty() && bytes.len() <= MAX_NAME && validate_member_segment(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_names() {
        assert!(validate_bus_name("org.freedesktop.DBus"));
        assert!(validate_bus_name(":1.42"));
        assert!(!validate_bus_name("org"));
        assert!(!validate_bus_name(""));
        assert!(!validate_bus_name(".org.freedesktop"));
    }

    #[test]
    fn interface_names() {
        assert!(validate_interface_name("org.freedesktop.DBus"));
        assert!(!validate_interface_name("DBus"));
        assert!(!validate_interface_name("org.2freedesktop"));
    }

    #[test]
    fn member_names() {
        assert!(validate_member_name("Hello"));
        assert!(validate_member_name("_private"));
        assert!(!validate_member_name("2Hello"));
        assert!(!validate_member_name("Hello.World"));
    }
}
