use std::fmt::Write;

use super::model::{access_str, emits_changed_str};
use super::{Direction, Node};

/// Serialize `node` to a `<node>` introspection document, the inverse of
/// [`super::parse_node`] modulo whitespace.
pub fn write_node(node: &Node) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE node PUBLIC \"-//freedesktop//DTD D-BUS Object Introspection 1.0//EN\"\n\"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n");
    out.push_str("<node>\n");

    for interface in node.interfaces() {
        let _ = writeln!(out, "  <interface name=\"{}\">", interface.name().as_str());

        for method in interface.methods() {
            let _ = writeln!(out, "    <method name=\"{}\">", method.name().as_str());

            for arg in method.args() {
                write_arg(&mut out, "      ", arg.name(), arg.signature().as_str(), Some(arg.direction()));
            }

            for annotation in method.annotations() {
                write_annotation(&mut out, "      ", annotation.name(), annotation.value());
            }

            out.push_str("    </method>\n");
        }

        for signal in interface.signals() {
            let _ = writeln!(out, "    <signal name=\"{}\">", signal.name().as_str());

            for arg in signal.args() {
                write_arg(&mut out, "      ", arg.name(), arg.signature().as_str(), None);
            }

            for annotation in signal.annotations() {
                write_annotation(&mut out, "      ", annotation.name(), annotation.value());
            }

            out.push_str("    </signal>\n");
        }

        for property in interface.properties() {
            let _ = writeln!(
                out,
                "    <property name=\"{}\" type=\"{}\" access=\"{}\">",
                property.name(),
                property.signature().as_str(),
                access_str(property.access())
            );
            write_annotation(
                &mut out,
                "      ",
                "org.freedesktop.DBus.Property.EmitsChangedSignal",
                emits_changed_str(property.emits_changed()),
            );
            out.push_str("    </property>\n");
        }

        for annotation in interface.annotations() {
            write_annotation(&mut out, "    ", annotation.name(), annotation.value());
        }

        out.push_str("  </interface>\n");
    }

    for child in node.children() {
        let _ = writeln!(out, "  <node name=\"{child}\"/>");
    }

    out.push_str("</node>\n");
    out
}

fn write_arg(out: &mut String, indent: &str, name: Option<&str>, signature: &str, direction: Option<Direction>) {
    match (name, direction) {
        (Some(name), Some(dir)) => {
            let _ = writeln!(
                out,
                "{indent}<arg name=\"{name}\" type=\"{signature}\" direction=\"{}\"/>",
                direction_str(dir)
            );
        }
        (Some(name), None) => {
            let _ = writeln!(out, "{indent}<arg name=\"{name}\" type=\"{signature}\"/>");
        }
        (None, Some(dir)) => {
            let _ = writeln!(
                out,
                "{indent}<arg type=\"{signature}\" direction=\"{}\"/>",
                direction_str(dir)
            );
        }
        (None, None) => {
            let _ = writeln!(out, "{indent}<arg type=\"{signature}\"/>");
        }
    }
}

fn write_annotation(out: &mut String, indent: &str, name: &str, value: &str) {
    let _ = writeln!(out, "{indent}<annotation name=\"{name}\" value=\"{value}\"/>");
}

fn direction_str(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "in",
        Direction::Out => "out",
    }
}
