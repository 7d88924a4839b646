/// One step of a SASL mechanism's exchange with the server.
///
/// Mechanisms in this crate are single-shot: they produce an initial
/// response and never need to react to a `DATA` challenge, so
/// [`Mechanism::handle_data`] always fails. A mechanism that genuinely
/// negotiates in multiple steps would override it instead.
pub trait Mechanism {
    /// The mechanism name as it appears after `AUTH` on the wire, e.g.
    /// `EXTERNAL`.
    fn name(&self) -> &'static str;

    /// The hex-encoded initial response sent alongside `AUTH <name>`.
    fn initial_response(&self) -> Vec<u8>;

    /// React to a `DATA <hex>` challenge from the server. The default
    /// rejects any challenge, since neither `EXTERNAL` nor `ANONYMOUS`
    /// expect one.
    fn handle_data(&self, _data: &[u8]) -> Option<Vec<u8>> {
        None
    }
}

/// `EXTERNAL`: authenticates as the local Unix user, sending the decimal
/// UID ASCII-encoded (then hex-encoded per the line protocol).
#[derive(Debug, Clone, Copy)]
pub struct External {
    uid: u32,
}

impl External {
    /// Construct an `EXTERNAL` mechanism for the given UID.
    pub fn new(uid: u32) -> Self {
        Self { uid }
    }

    /// Construct an `EXTERNAL` mechanism for the current process' UID.
    #[cfg(all(unix, feature = "tokio"))]
    pub fn current_uid() -> Self {
        // SAFETY: `getuid` has no preconditions and never fails.
        let uid = unsafe { libc::getuid() };
        Self::new(uid)
    }
}

impl Mechanism for External {
    fn name(&self) -> &'static str {
        "EXTERNAL"
    }

    fn initial_response(&self) -> Vec<u8> {
        self.uid.to_string().into_bytes()
    }
}

/// `ANONYMOUS`: no credentials; initial data is an arbitrary ASCII trace
/// string carried for diagnostic purposes only.
#[derive(Debug, Clone)]
pub struct Anonymous {
    trace: String,
}

impl Anonymous {
    /// Construct an `ANONYMOUS` mechanism with the given trace string.
    pub fn new(trace: impl Into<String>) -> Self {
        Self {
            trace: trace.into(),
        }
    }
}

impl Default for Anonymous {
    fn default() -> Self {
        Self::new("dbus-peer")
    }
}

impl Mechanism for Anonymous {
    fn name(&self) -> &'static str {
        "ANONYMOUS"
    }

    fn initial_response(&self) -> Vec<u8> {
        self.trace.clone().into_bytes()
    }
}
