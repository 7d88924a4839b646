use dbus_peer_core::signature::SignatureBuf;
use xmlparser::{ElementEnd, Token};

use crate::error::{Error, ErrorKind, Result};
use crate::names::{InterfaceName, MemberName};

use super::model::{parse_access, parse_emits_changed};
use super::{Annotation, Argument, Direction, Interface, Method, Node, Property, Signal};

/// Parse a `<node>` introspection document, as returned by
/// `org.freedesktop.DBus.Introspectable.Introspect`.
pub fn parse_node(xml: &str) -> Result<Node> {
    let mut stack: Vec<Elem> = Vec::new();
    let mut node = Node::new();

    for token in xmlparser::Tokenizer::from(xml) {
        let token = token.map_err(|_| Error::from(ErrorKind::InvalidIntrospection("malformed XML")))?;

        match token {
            Token::ElementStart { local, .. } => {
                let elem = match (stack.last(), local.as_str()) {
                    (None, "node") => Elem::Node,
                    (Some(Elem::Node), "node") => Elem::ChildNode(String::new()),
                    (Some(Elem::Node), "interface") => Elem::Interface(InterfaceBuilder::default()),
                    (Some(Elem::Interface(_)), "method") => Elem::Method(MethodBuilder::default()),
                    (Some(Elem::Interface(_)), "signal") => Elem::Signal(SignalBuilder::default()),
                    (Some(Elem::Interface(_)), "property") => Elem::Property(PropertyBuilder::default()),
                    (Some(Elem::Method(_) | Elem::Signal(_) | Elem::Interface(_) | Elem::Property(_)), "arg") => {
                        Elem::Arg(ArgBuilder::default())
                    }
                    (Some(Elem::Interface(_) | Elem::Method(_) | Elem::Signal(_) | Elem::Property(_)), "annotation") => {
                        Elem::Annotation(AnnotationBuilder::default())
                    }
                    (_, other) => {
                        return Err(unsupported(other));
                    }
                };
                stack.push(elem);
            }
            Token::Attribute { local, value, .. } => {
                let Some(top) = stack.last_mut() else {
                    continue;
                };

                apply_attribute(top, local.as_str(), value.as_str())?;
            }
            Token::ElementEnd { end, .. } => {
                match end {
                    ElementEnd::Open => continue,
                    ElementEnd::Close(..) | ElementEnd::Empty => {}
                }

                let Some(top) = stack.pop() else {
                    return Err(Error::from(ErrorKind::InvalidIntrospection(
                        "unbalanced closing tag",
                    )));
                };

                match (stack.last_mut(), top) {
                    (None, Elem::Node) => {}
                    (Some(Elem::Node), Elem::ChildNode(name)) => {
                        node.push_child(name);
                    }
                    (Some(Elem::Node), Elem::Interface(builder)) => {
                        node.push_interface(builder.build()?);
                    }
                    (Some(Elem::Interface(iface)), Elem::Method(builder)) => {
                        iface.methods.push(builder.build()?);
                    }
                    (Some(Elem::Interface(iface)), Elem::Signal(builder)) => {
                        iface.signals.push(builder.build()?);
                    }
                    (Some(Elem::Interface(iface)), Elem::Property(builder)) => {
                        iface.properties.push(builder.build()?);
                    }
                    (Some(Elem::Interface(iface)), Elem::Annotation(builder)) => {
                        iface.annotations.push(builder.build()?);
                    }
                    (Some(Elem::Method(m)), Elem::Arg(builder)) => {
                        m.args.push(builder.build_method_arg()?);
                    }
                    (Some(Elem::Method(m)), Elem::Annotation(builder)) => {
                        m.annotations.push(builder.build()?);
                    }
                    (Some(Elem::Signal(s)), Elem::Arg(builder)) => {
                        s.args.push(builder.build_signal_arg()?);
                    }
                    (Some(Elem::Signal(s)), Elem::Annotation(builder)) => {
                        s.annotations.push(builder.build()?);
                    }
                    (Some(Elem::Property(_)), Elem::Annotation(_)) => {}
                    _ => {
                        return Err(Error::from(ErrorKind::InvalidIntrospection(
                            "element nested under an unexpected parent",
                        )))
                    }
                }
            }
            _ => {}
        }
    }

    Ok(node)
}

fn unsupported(name: &str) -> Error {
    let _ = name;
    Error::from(ErrorKind::InvalidIntrospection("unsupported element"))
}

enum Elem {
    Node,
    ChildNode(String),
    Interface(InterfaceBuilder),
    Method(MethodBuilder),
    Signal(SignalBuilder),
    Property(PropertyBuilder),
    Arg(ArgBuilder),
    Annotation(AnnotationBuilder),
}

fn apply_attribute(elem: &mut Elem, key: &str, value: &str) -> Result<()> {
    match (elem, key) {
        (Elem::ChildNode(name), "name") => *name = value.to_owned(),
        (Elem::Interface(b), "name") => b.name = Some(value.to_owned()),
        (Elem::Method(b), "name") => b.name = Some(value.to_owned()),
        (Elem::Signal(b), "name") => b.name = Some(value.to_owned()),
        (Elem::Property(b), "name") => b.name = Some(value.to_owned()),
        (Elem::Property(b), "type") => {
            b.signature = Some(SignatureBuf::new(value.to_owned())?);
        }
        (Elem::Property(b), "access") => {
            b.access = Some(parse_access(value).ok_or_else(|| {
                Error::from(ErrorKind::InvalidIntrospection("invalid property access"))
            })?);
        }
        (Elem::Arg(b), "name") => b.name = Some(value.to_owned()),
        (Elem::Arg(b), "type") => b.signature = Some(SignatureBuf::new(value.to_owned())?),
        (Elem::Arg(b), "direction") => {
            b.direction = Some(match value {
                "in" => Direction::In,
                "out" => Direction::Out,
                _ => {
                    return Err(Error::from(ErrorKind::InvalidIntrospection(
                        "invalid argument direction",
                    )))
                }
            });
        }
        (Elem::Annotation(b), "name") => b.name = Some(value.to_owned()),
        (Elem::Annotation(b), "value") => b.value = Some(value.to_owned()),
        _ => {}
    }

    Ok(())
}

#[derive(Default)]
struct InterfaceBuilder {
    name: Option<String>,
    methods: Vec<Method>,
    signals: Vec<Signal>,
    properties: Vec<Property>,
    annotations: Vec<Annotation>,
}

impl InterfaceBuilder {
    fn build(self) -> Result<Interface> {
        let name = self
            .name
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("interface missing 'name'")))?;
        let mut iface = Interface::new(InterfaceName::new(name)?);

        for method in self.methods {
            iface = iface.with_method(method);
        }
        for signal in self.signals {
            iface = iface.with_signal(signal);
        }
        for property in self.properties {
            iface = iface.with_property(property);
        }
        for annotation in self.annotations {
            iface = iface.with_annotation(annotation);
        }

        Ok(iface)
    }
}

#[derive(Default)]
struct MethodBuilder {
    name: Option<String>,
    args: Vec<Argument>,
    annotations: Vec<Annotation>,
}

impl MethodBuilder {
    fn build(self) -> Result<Method> {
        let name = self
            .name
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("method missing 'name'")))?;
        let mut m = Method::new(MemberName::new(name)?);

        for arg in self.args {
            m = m.with_arg(arg);
        }
        for annotation in self.annotations {
            m = m.with_annotation(annotation);
        }

        Ok(m)
    }
}

#[derive(Default)]
struct SignalBuilder {
    name: Option<String>,
    args: Vec<Argument>,
    annotations: Vec<Annotation>,
}

impl SignalBuilder {
    fn build(self) -> Result<Signal> {
        let name = self
            .name
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("signal missing 'name'")))?;
        let mut s = Signal::new(MemberName::new(name)?);

        for arg in self.args {
            s = s.with_arg(arg);
        }
        for annotation in self.annotations {
            s = s.with_annotation(annotation);
        }

        Ok(s)
    }
}

#[derive(Default)]
struct PropertyBuilder {
    name: Option<String>,
    signature: Option<SignatureBuf>,
    access: Option<super::model::Access>,
}

impl PropertyBuilder {
    fn build(self) -> Result<Property> {
        let name = self
            .name
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("property missing 'name'")))?;
        let signature = self
            .signature
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("property missing 'type'")))?;
        let access = self
            .access
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("property missing 'access'")))?;

        Ok(Property::new(name, signature, access))
    }
}

#[derive(Default)]
struct ArgBuilder {
    name: Option<String>,
    signature: Option<SignatureBuf>,
    direction: Option<Direction>,
}

impl ArgBuilder {
    fn build_method_arg(self) -> Result<Argument> {
        let signature = self
            .signature
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("arg missing 'type'")))?;
        // Method args default to `in` when unmarked, matching the D-Bus
        // specification's documented default.
        let direction = self.direction.unwrap_or(Direction::In);
        Ok(Argument::new(self.name, signature, direction))
    }

    fn build_signal_arg(self) -> Result<Argument> {
        let signature = self
            .signature
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("arg missing 'type'")))?;
        Ok(Argument::new(self.name, signature, Direction::Out))
    }
}

#[derive(Default)]
struct AnnotationBuilder {
    name: Option<String>,
    value: Option<String>,
}

impl AnnotationBuilder {
    fn build(self) -> Result<Annotation> {
        let name = self
            .name
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("annotation missing 'name'")))?;
        let value = self
            .value
            .ok_or_else(|| Error::from(ErrorKind::InvalidIntrospection("annotation missing 'value'")))?;
        Ok(Annotation::new(name, value))
    }
}
