use dbus_peer_core::signature::SignatureBuf;

use crate::names::{InterfaceName, MemberName};

/// The direction of a method argument. Signal arguments carry no direction;
/// the D-Bus specification treats them as implicitly `out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// An input argument, supplied by the caller.
    In,
    /// An output argument, returned to the caller.
    Out,
}

/// A single method or signal argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: Option<String>,
    signature: SignatureBuf,
    direction: Direction,
}

impl Argument {
    /// Construct a method argument.
    pub fn new(name: Option<impl Into<String>>, signature: SignatureBuf, direction: Direction) -> Self {
        Self {
            name: name.map(Into::into),
            signature,
            direction,
        }
    }

    /// The argument's name, if the interface declares one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The argument's signature.
    pub fn signature(&self) -> &SignatureBuf {
        &self.signature
    }

    /// The argument's direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Property access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `Get` only.
    Read,
    /// `Set` only.
    Write,
    /// Both `Get` and `Set`.
    ReadWrite,
}

impl Access {
    /// Whether `Get` is permitted.
    pub fn readable(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    /// Whether `Set` is permitted.
    pub fn writable(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }

    fn as_str(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::ReadWrite => "readwrite",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Access::Read),
            "write" => Some(Access::Write),
            "readwrite" => Some(Access::ReadWrite),
            _ => None,
        }
    }
}

/// The `org.freedesktop.DBus.Property.EmitsChangedSignal` annotation value
/// for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitsChangedSignal {
    /// `PropertiesChanged` fires with the new value included.
    #[default]
    True,
    /// `PropertiesChanged` fires but the new value is omitted; readers must
    /// call `Get`.
    Invalidates,
    /// The property never changes after the object is created.
    Const,
    /// No change notification is ever emitted.
    False,
}

impl EmitsChangedSignal {
    fn as_str(self) -> &'static str {
        match self {
            EmitsChangedSignal::True => "true",
            EmitsChangedSignal::Invalidates => "invalidates",
            EmitsChangedSignal::Const => "const",
            EmitsChangedSignal::False => "false",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "true" => Some(EmitsChangedSignal::True),
            "invalidates" => Some(EmitsChangedSignal::Invalidates),
            "const" => Some(EmitsChangedSignal::Const),
            "false" => Some(EmitsChangedSignal::False),
            _ => None,
        }
    }
}

/// A free-form `<annotation name="..." value="..."/>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub(super) name: String,
    pub(super) value: String,
}

impl Annotation {
    /// Construct an annotation.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The annotation name, e.g. `org.freedesktop.DBus.Deprecated`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The annotation value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    name: MemberName,
    args: Vec<Argument>,
    annotations: Vec<Annotation>,
}

impl Method {
    /// Construct a method with no arguments or annotations.
    pub fn new(name: MemberName) -> Self {
        Self {
            name,
            args: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Builder: append an argument, in declaration order.
    #[must_use]
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    /// Builder: append an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// The method name.
    pub fn name(&self) -> &MemberName {
        &self.name
    }

    /// Arguments, in declaration order.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// The `in` arguments' combined signature, in order, as sent in a
    /// `METHOD_CALL` body.
    pub fn in_signature(&self) -> SignatureBuf {
        combine(self.args.iter().filter(|a| a.direction == Direction::In))
    }

    /// The `out` arguments' combined signature, in order, as sent in the
    /// `METHOD_RETURN` body.
    pub fn out_signature(&self) -> SignatureBuf {
        combine(self.args.iter().filter(|a| a.direction == Direction::Out))
    }

    /// Annotations on this method.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// A signal declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    name: MemberName,
    args: Vec<Argument>,
    annotations: Vec<Annotation>,
}

impl Signal {
    /// Construct a signal with no arguments or annotations.
    pub fn new(name: MemberName) -> Self {
        Self {
            name,
            args: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Builder: append an argument, in declaration order.
    #[must_use]
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    /// Builder: append an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// The signal name.
    pub fn name(&self) -> &MemberName {
        &self.name
    }

    /// Arguments, in declaration order.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// The combined signature of the signal's body.
    pub fn signature(&self) -> SignatureBuf {
        combine(self.args.iter())
    }

    /// Annotations on this signal.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// A property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    signature: SignatureBuf,
    access: Access,
    emits_changed: EmitsChangedSignal,
}

impl Property {
    /// Construct a property declaration.
    pub fn new(name: impl Into<String>, signature: SignatureBuf, access: Access) -> Self {
        Self {
            name: name.into(),
            signature,
            access,
            emits_changed: EmitsChangedSignal::default(),
        }
    }

    /// Builder: override the `EmitsChangedSignal` annotation.
    #[must_use]
    pub fn with_emits_changed(mut self, emits_changed: EmitsChangedSignal) -> Self {
        self.emits_changed = emits_changed;
        self
    }

    /// The property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The property's value type.
    pub fn signature(&self) -> &SignatureBuf {
        &self.signature
    }

    /// The access mode.
    pub fn access(&self) -> Access {
        self.access
    }

    /// The `EmitsChangedSignal` behavior.
    pub fn emits_changed(&self) -> EmitsChangedSignal {
        self.emits_changed
    }
}

/// A single interface's full schema: methods, signals, properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    name: InterfaceName,
    methods: Vec<Method>,
    signals: Vec<Signal>,
    properties: Vec<Property>,
    annotations: Vec<Annotation>,
}

impl Interface {
    /// Construct an interface with nothing declared yet.
    pub fn new(name: InterfaceName) -> Self {
        Self {
            name,
            methods: Vec::new(),
            signals: Vec::new(),
            properties: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Builder: append a method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Builder: append a signal.
    #[must_use]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Builder: append a property.
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Builder: append an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// The interface name.
    pub fn name(&self) -> &InterfaceName {
        &self.name
    }

    /// Declared methods.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Look up a method by name.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name().as_str() == name)
    }

    /// Declared signals.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Declared properties.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Annotations on this interface.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// A node: the interfaces at a path plus the relative names of its
/// immediate children, as returned by `Introspectable.Introspect`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    interfaces: Vec<Interface>,
    children: Vec<String>,
}

impl Node {
    /// A node with nothing declared yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append an interface.
    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Builder: append a child node's relative name.
    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>) -> Self {
        self.children.push(name.into());
        self
    }

    pub(crate) fn push_interface(&mut self, interface: Interface) {
        self.interfaces.push(interface);
    }

    pub(crate) fn push_child(&mut self, name: String) {
        self.children.push(name);
    }

    /// The interfaces declared at this node.
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Look up an interface by name.
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name().as_str() == name)
    }

    /// The relative names of this node's immediate children.
    pub fn children(&self) -> &[String] {
        &self.children
    }
}

fn combine<'a>(args: impl Iterator<Item = &'a Argument>) -> SignatureBuf {
    let mut buf = SignatureBuf::empty();

    for arg in args {
        buf.push_signature(arg.signature());
    }

    buf
}

pub(super) fn parse_access(s: &str) -> Option<Access> {
    Access::parse(s)
}

pub(super) fn access_str(access: Access) -> &'static str {
    access.as_str()
}

pub(super) fn parse_emits_changed(s: &str) -> Option<EmitsChangedSignal> {
    EmitsChangedSignal::parse(s)
}

pub(super) fn emits_changed_str(value: EmitsChangedSignal) -> &'static str {
    value.as_str()
}
