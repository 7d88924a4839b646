use crate::names::{BusName, InterfaceName, MemberName};
use crate::object_path::ObjectPathBuf;

/// A signal match rule: `(sender, interface, member, path, path_namespace,
/// destination, args…)`, as installed with [`super::MessageBus::add_match`]
/// and mirrored to the bus daemon via `org.freedesktop.DBus.AddMatch`.
///
/// Every field defaults to "don't care"; a rule matching nothing in
/// particular matches every signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MatchRule {
    sender: Option<BusName>,
    interface: Option<InterfaceName>,
    member: Option<MemberName>,
    path: Option<ObjectPathBuf>,
    path_namespace: Option<ObjectPathBuf>,
    destination: Option<BusName>,
    args: Vec<(u8, String)>,
}

impl MatchRule {
    /// A rule matching every signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: match only signals from `sender`.
    #[must_use]
    pub fn with_sender(mut self, sender: BusName) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Builder: match only signals on `interface`.
    #[must_use]
    pub fn with_interface(mut self, interface: InterfaceName) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Builder: match only the signal named `member`.
    #[must_use]
    pub fn with_member(mut self, member: MemberName) -> Self {
        self.member = Some(member);
        self
    }

    /// Builder: match only signals emitted from exactly `path`.
    #[must_use]
    pub fn with_path(mut self, path: ObjectPathBuf) -> Self {
        self.path = Some(path);
        self
    }

    /// Builder: match signals emitted from `namespace` or any of its
    /// descendants.
    #[must_use]
    pub fn with_path_namespace(mut self, namespace: ObjectPathBuf) -> Self {
        self.path_namespace = Some(namespace);
        self
    }

    /// Builder: match only signals addressed to `destination`.
    #[must_use]
    pub fn with_destination(mut self, destination: BusName) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Builder: require the string argument at `index` to equal `value`.
    #[must_use]
    pub fn with_arg(mut self, index: u8, value: impl Into<String>) -> Self {
        self.args.push((index, value.into()));
        self
    }

    /// Render this rule as the `key='value',...` string the
    /// `org.freedesktop.DBus.AddMatch`/`RemoveMatch` methods expect.
    pub fn to_rule_string(&self) -> String {
        let mut parts = vec!["type='signal'".to_owned()];

        if let Some(sender) = &self.sender {
            parts.push(format!("sender='{}'", sender.as_str()));
        }

        if let Some(interface) = &self.interface {
            parts.push(format!("interface='{}'", interface.as_str()));
        }

        if let Some(member) = &self.member {
            parts.push(format!("member='{}'", member.as_str()));
        }

        if let Some(path) = &self.path {
            parts.push(format!("path='{}'", path.as_str()));
        }

        if let Some(namespace) = &self.path_namespace {
            parts.push(format!("path_namespace='{}'", namespace.as_str()));
        }

        if let Some(destination) = &self.destination {
            parts.push(format!("destination='{}'", destination.as_str()));
        }

        for (index, value) in &self.args {
            parts.push(format!("arg{index}='{value}'"));
        }

        parts.join(",")
    }

    /// Test whether `message` (a `SIGNAL`) satisfies this rule.
    pub(super) fn matches(&self, message: &crate::message::MessageBuf) -> bool {
        use crate::proto::MessageType;
        use crate::value::Value;

        if message.message_type() != MessageType::SIGNAL {
            return false;
        }

        if let Some(sender) = &self.sender {
            if message.sender() != Some(sender) {
                return false;
            }
        }

        if let Some(interface) = &self.interface {
            if message.interface().map(|i| i.as_str()) != Some(interface.as_str()) {
                return false;
            }
        }

        if let Some(member) = &self.member {
            if message.member().map(|m| m.as_str()) != Some(member.as_str()) {
                return false;
            }
        }

        if let Some(path) = &self.path {
            if message.path().map(|p| p.as_str()) != Some(path.as_str()) {
                return false;
            }
        }

        if let Some(namespace) = &self.path_namespace {
            match message.path() {
                Some(path) if path.starts_with(namespace.as_object_path()) => {}
                _ => return false,
            }
        }

        if let Some(destination) = &self.destination {
            if message.destination() != Some(destination) {
                return false;
            }
        }

        for (index, expected) in &self.args {
            match message.body().get(*index as usize) {
                Some(Value::Str(actual)) if actual == expected => {}
                _ => return false,
            }
        }

        true
    }
}

/// An opaque handle to an installed match rule, returned by
/// [`super::MessageBus::add_match`] and consumed by
/// [`super::MessageBus::remove_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchToken(pub(super) u64);
