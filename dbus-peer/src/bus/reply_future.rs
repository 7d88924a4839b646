use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, ErrorKind, Result};
use crate::message::{MessageBuf, Serial};

use super::command::Command;

/// The outcome of a `METHOD_CALL` sent through [`super::MessageBus::send`].
///
/// Polling this future suspends until the dispatch loop fulfills the
/// corresponding pending-reply entry with a `METHOD_RETURN` body, fails it
/// with the `DBusError` carried by an `ERROR` reply, or fails it with a
/// connection error if the bus disconnects first.
///
/// Dropping this future before it resolves cancels the call: the pending
/// entry is removed, and a reply that arrives afterward is dropped silently.
pub struct ReplyFuture {
    serial: Serial,
    commands: mpsc::UnboundedSender<Command>,
    receiver: oneshot::Receiver<Result<MessageBuf>>,
    cancelled: bool,
}

impl ReplyFuture {
    pub(super) fn new(
        serial: Serial,
        commands: mpsc::UnboundedSender<Command>,
        receiver: oneshot::Receiver<Result<MessageBuf>>,
    ) -> Self {
        Self {
            serial,
            commands,
            receiver,
            cancelled: false,
        }
    }

    /// The serial this reply is correlated against.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Cancel the call. The pending entry is removed immediately; a later
    /// reply for this serial is dropped by the dispatch loop.
    pub fn cancel(mut self) {
        self.cancelled = true;
        let _ = self.commands.send(Command::CancelReply {
            serial: self.serial,
        });
    }

    /// Wait for the reply with a bound on how long to wait, failing with
    /// [`ErrorKind::Timeout`] on expiry. The pending entry is removed either
    /// way.
    pub async fn with_timeout(self, duration: std::time::Duration) -> Result<MessageBuf> {
        let serial = self.serial;
        let commands = self.commands.clone();

        match tokio::time::timeout(duration, self).await {
            Ok(result) => result,
            Err(_) => {
                let _ = commands.send(Command::CancelReply { serial });
                Err(Error::from(ErrorKind::Timeout))
            }
        }
    }
}

impl Future for ReplyFuture {
    type Output = Result<MessageBuf>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::from(ErrorKind::ConnectionClosed))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ReplyFuture {
    fn drop(&mut self) {
        if !self.cancelled {
            let _ = self.commands.send(Command::CancelReply {
                serial: self.serial,
            });
        }
    }
}
