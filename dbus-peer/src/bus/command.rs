use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::introspect::Node;
use crate::message::{MessageBuf, Serial};
use crate::names::{BusName, InterfaceName};
use crate::object_path::ObjectPathBuf;

use super::export::ExportedInterface;
use super::match_rule::{MatchRule, MatchToken};
use super::{ReleaseNameReply, RequestNameFlags, RequestNameReply};

/// Work items handed from [`super::MessageBus`]'s public methods to the
/// single dispatch task that owns the transport and every correlation
/// table. Centralizing mutation in the task that also reads the socket is
/// what makes re-entrant sends (e.g. from within a signal handler) safe
/// without any lock held across an await point.
pub(super) enum Command {
    Send {
        message: MessageBuf,
        reply: Option<oneshot::Sender<Result<MessageBuf>>>,
        reply_serial: Option<oneshot::Sender<Serial>>,
    },
    CancelReply {
        serial: Serial,
    },
    AddMatch {
        rule: MatchRule,
        sender: mpsc::UnboundedSender<MessageBuf>,
        reply: oneshot::Sender<Result<MatchToken>>,
    },
    RemoveMatch {
        token: MatchToken,
        reply: oneshot::Sender<Result<()>>,
    },
    Export {
        path: ObjectPathBuf,
        interface: InterfaceName,
        object: Arc<dyn ExportedInterface>,
        reply: oneshot::Sender<Result<()>>,
    },
    Unexport {
        path: ObjectPathBuf,
        interface: Option<InterfaceName>,
        reply: oneshot::Sender<Result<()>>,
    },
    RequestName {
        name: BusName,
        flags: RequestNameFlags,
        reply: oneshot::Sender<Result<RequestNameReply>>,
    },
    ReleaseName {
        name: BusName,
        reply: oneshot::Sender<Result<ReleaseNameReply>>,
    },
    Introspect {
        destination: BusName,
        path: ObjectPathBuf,
        reply: oneshot::Sender<Result<Node>>,
    },
    Disconnect,
}
