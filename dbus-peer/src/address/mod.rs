//! Parsing of D-Bus server addresses: `transport:key=value,key=value;…`
//! lists, as used in `DBUS_SESSION_BUS_ADDRESS` and friends.

pub use self::transport::{Tcp, TcpFamily, Unix, UnixPath};
mod transport;

use std::collections::HashMap;

use crate::error::{Error, ErrorKind, Result};

/// One transport-specific endpoint parsed out of an address list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// `unix:path=...` or `unix:abstract=...`
    Unix(Unix),
    /// `tcp:host=...,port=...`
    Tcp(Tcp),
    /// `launchd:env=...`, resolved to a [`Unix`] address by invoking
    /// `launchctl getenv` once; see [`resolve_launchd`].
    Launchd {
        /// The environment variable name to query via `launchctl getenv`.
        env: String,
    },
}

/// Parse a full D-Bus address list (semicolon-separated endpoints), in the
/// order they should be tried.
///
/// # Examples
///
/// ```
/// use dbus_peer::address::{parse, Address};
///
/// let addrs = parse("unix:path=/run/dbus/system_bus_socket").unwrap();
/// assert_eq!(addrs.len(), 1);
/// assert!(matches!(addrs[0], Address::Unix(_)));
/// ```
pub fn parse(addresses: &str) -> Result<Vec<Address>> {
    addresses
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(parse_one)
        .collect()
}

fn parse_one(entry: &str) -> Result<Address> {
    let (transport, rest) = entry
        .split_once(':')
        .ok_or_else(|| Error::from(ErrorKind::InvalidAddress("missing ':' after transport name")))?;

    let opts = parse_options(rest)?;

    match transport {
        "unix" => Unix::from_options(&opts).map(Address::Unix),
        "tcp" => Tcp::from_options(&opts).map(Address::Tcp),
        "launchd" => {
            let env = opts
                .get("env")
                .ok_or_else(|| Error::from(ErrorKind::InvalidAddress("launchd: missing 'env' key")))?;
            Ok(Address::Launchd {
                env: (*env).to_owned(),
            })
        }
        _ => Err(Error::from(ErrorKind::InvalidAddress(
            "unsupported transport",
        ))),
    }
}

fn parse_options(rest: &str) -> Result<HashMap<&str, &str>> {
    let mut opts = HashMap::new();

    for pair in rest.split(',').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::from(ErrorKind::InvalidAddress("key/value pair missing '='")))?;
        opts.insert(key, value);
    }

    Ok(opts)
}

/// Percent-decode a D-Bus address value, per the escaping rule in the
/// D-Bus specification (`%` followed by two hex digits).
pub(crate) fn percent_decode(value: &str) -> Result<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::from(ErrorKind::InvalidAddress("truncated percent escape")))?;
            let hex = std::str::from_utf8(hex)
                .map_err(|_| Error::from(ErrorKind::InvalidAddress("non-ASCII percent escape")))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| Error::from(ErrorKind::InvalidAddress("invalid percent escape")))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| Error::from(ErrorKind::InvalidAddress("non-UTF-8 address value")))
}

/// Resolve an [`Address::Launchd`] entry to a [`Unix`] socket address by
/// running `launchctl getenv <env>` once and trimming its output.
#[cfg(feature = "tokio")]
pub async fn resolve_launchd(env: &str) -> Result<Unix> {
    let output = tokio::process::Command::new("launchctl")
        .args(["getenv", env])
        .output()
        .await
        .map_err(Error::from)?;

    if !output.status.success() {
        return Err(Error::from(ErrorKind::InvalidAddress(
            "launchctl getenv failed",
        )));
    }

    let path = std::str::from_utf8(&output.stdout)
        .map_err(|_| Error::from(ErrorKind::InvalidAddress("launchctl output was not UTF-8")))?
        .trim();

    Ok(Unix::new(UnixPath::File(path.to_owned())))
}

/// Resolve every [`Address::Launchd`] entry in `addrs` to its underlying
/// [`Address::Unix`], leaving other entries untouched.
#[cfg(feature = "tokio")]
pub async fn resolve_all(addrs: Vec<Address>) -> Result<Vec<Address>> {
    let mut resolved = Vec::with_capacity(addrs.len());

    for addr in addrs {
        match addr {
            Address::Launchd { env } => resolved.push(Address::Unix(resolve_launchd(&env).await?)),
            other => resolved.push(other),
        }
    }

    Ok(resolved)
}

const ENV_STARTER_ADDRESS: &str = "DBUS_STARTER_ADDRESS";
const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// Resolve the session bus address list from `DBUS_STARTER_ADDRESS` or
/// `DBUS_SESSION_BUS_ADDRESS`. Fails with [`crate::error::ErrorKind::MissingBus`]
/// if neither is set.
pub fn session() -> Result<Vec<Address>> {
    from_env([ENV_STARTER_ADDRESS, ENV_SESSION_BUS], None)
}

/// Resolve the system bus address list from `DBUS_STARTER_ADDRESS` or
/// `DBUS_SYSTEM_BUS_ADDRESS`, falling back to the well-known path
/// `unix:path=/var/run/dbus/system_bus_socket` if neither is set.
pub fn system() -> Result<Vec<Address>> {
    from_env([ENV_STARTER_ADDRESS, ENV_SYSTEM_BUS], Some(DEFAULT_SYSTEM_BUS))
}

fn from_env<const N: usize>(envs: [&str; N], default: Option<&str>) -> Result<Vec<Address>> {
    for env in envs {
        if let Ok(address) = std::env::var(env) {
            return parse(&address);
        }
    }

    match default {
        Some(address) => parse(address),
        None => Err(Error::from(ErrorKind::MissingBus)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unix_path() {
        let addrs = parse("unix:path=/run/dbus/system_bus_socket").unwrap();
        assert_eq!(addrs.len(), 1);
        match &addrs[0] {
            Address::Unix(unix) => assert_eq!(unix.path(), &UnixPath::File("/run/dbus/system_bus_socket".into())),
            _ => panic!("expected unix"),
        }
    }

    #[test]
    fn parses_unix_abstract() {
        let addrs = parse("unix:abstract=/tmp/dbus-abcd1234").unwrap();
        match &addrs[0] {
            Address::Unix(unix) => assert_eq!(unix.path(), &UnixPath::Abstract("/tmp/dbus-abcd1234".into())),
            _ => panic!("expected unix"),
        }
    }

    #[test]
    fn parses_tcp() {
        let addrs = parse("tcp:host=127.0.0.1,port=1234").unwrap();
        match &addrs[0] {
            Address::Tcp(tcp) => {
                assert_eq!(tcp.host(), "127.0.0.1");
                assert_eq!(tcp.port(), 1234);
            }
            _ => panic!("expected tcp"),
        }
    }

    #[test]
    fn parses_multiple_entries_in_order() {
        let addrs = parse("unix:path=/a;tcp:host=127.0.0.1,port=1").unwrap();
        assert_eq!(addrs.len(), 2);
        assert!(matches!(addrs[0], Address::Unix(_)));
        assert!(matches!(addrs[1], Address::Tcp(_)));
    }

    #[test]
    fn rejects_missing_transport_colon() {
        assert!(parse("path=/a").is_err());
    }

    #[test]
    fn rejects_malformed_key_value() {
        assert!(parse("unix:path").is_err());
    }

    #[test]
    fn rejects_unknown_transport() {
        assert!(parse("carrier-pigeon:path=/a").is_err());
    }

    #[test]
    fn percent_decode_handles_escapes() {
        assert_eq!(percent_decode("/tmp/dbus-%20test").unwrap(), "/tmp/dbus- test");
    }

    #[test]
    fn percent_decode_rejects_truncated_escape() {
        assert!(percent_decode("/tmp/%2").is_err());
    }
}
