use dbus_peer_core::signature::SignatureBuf;

use crate::names::{InterfaceName, MemberName};

use super::*;

fn sig(s: &str) -> SignatureBuf {
    SignatureBuf::new(s.to_owned()).unwrap()
}

#[test]
fn builds_and_queries_a_node() {
    let iface = Interface::new(InterfaceName::new("com.example.Calc").unwrap())
        .with_method(
            Method::new(MemberName::new("Add").unwrap())
                .with_arg(Argument::new(Some("a"), sig("i"), Direction::In))
                .with_arg(Argument::new(Some("b"), sig("i"), Direction::In))
                .with_arg(Argument::new(Some("result"), sig("i"), Direction::Out)),
        )
        .with_signal(
            Signal::new(MemberName::new("Overflowed").unwrap())
                .with_arg(Argument::new(None::<&str>, sig("i"), Direction::Out)),
        )
        .with_property(Property::new("Total", sig("i"), Access::Read));

    let node = Node::new().with_interface(iface);

    let iface = node.interface("com.example.Calc").unwrap();
    let add = iface.method("Add").unwrap();
    assert_eq!(add.in_signature().as_str(), "ii");
    assert_eq!(add.out_signature().as_str(), "i");

    let signal = &iface.signals()[0];
    assert_eq!(signal.signature().as_str(), "i");

    let prop = iface.property("Total").unwrap();
    assert!(prop.access().readable());
    assert!(!prop.access().writable());
}

#[test]
fn xml_round_trips_through_parse_and_write() {
    let iface = Interface::new(InterfaceName::new("com.example.Calc").unwrap())
        .with_method(
            Method::new(MemberName::new("Add").unwrap())
                .with_arg(Argument::new(Some("a"), sig("i"), Direction::In))
                .with_arg(Argument::new(Some("result"), sig("i"), Direction::Out)),
        )
        .with_property(Property::new("Total", sig("i"), Access::ReadWrite));

    let node = Node::new().with_interface(iface).with_child("child");

    let xml = write_node(&node);
    let parsed = parse_node(&xml).unwrap();

    let iface = parsed.interface("com.example.Calc").unwrap();
    let add = iface.method("Add").unwrap();
    assert_eq!(add.args().len(), 2);
    assert_eq!(add.args()[0].name(), Some("a"));
    assert_eq!(add.args()[0].direction(), Direction::In);
    assert_eq!(add.args()[1].direction(), Direction::Out);

    let prop = iface.property("Total").unwrap();
    assert_eq!(prop.access(), Access::ReadWrite);

    assert_eq!(parsed.children(), &["child".to_owned()]);
}

#[test]
fn parse_rejects_missing_required_attribute() {
    let xml = "<node><interface><method name=\"Hi\"/></interface></node>";
    assert!(parse_node(xml).is_err());
}

#[test]
fn parse_rejects_malformed_xml() {
    assert!(parse_node("<node><interface>").is_err());
}

#[test]
fn parse_accepts_freedesktop_dbus_introspection() {
    let xml = r#"
        <node>
          <interface name="org.freedesktop.DBus.Peer">
            <method name="Ping"/>
            <method name="GetMachineId">
              <arg type="s" direction="out"/>
            </method>
          </interface>
        </node>
    "#;

    let node = parse_node(xml).unwrap();
    let iface = node.interface("org.freedesktop.DBus.Peer").unwrap();
    assert!(iface.method("Ping").unwrap().args().is_empty());
    assert_eq!(
        iface.method("GetMachineId").unwrap().out_signature().as_str(),
        "s"
    );
}
