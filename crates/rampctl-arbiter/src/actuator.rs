//! Where forwarded codes go.

use std::future::Future;

use rampctl_protocol::ActionCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

use crate::ArbiterError;

/// Consumes one forwarded action code at a time. No reply is expected.
///
/// The arbiter awaits each `send` before handling the next command, so
/// implementations see codes strictly in forwarding order.
pub trait ActuatorLink: Send + Sync + 'static {
    fn send(
        &self,
        code: &ActionCode,
    ) -> impl Future<Output = Result<(), ArbiterError>> + Send;
}

/// Writes each code followed by `\n` to an async writer, e.g. the serial
/// device the motor controller is attached to, or stdout.
pub struct LineActuator<W> {
    writer: Mutex<W>,
}

impl<W> LineActuator<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the actuator and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> ActuatorLink for LineActuator<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, code: &ActionCode) -> Result<(), ArbiterError> {
        let mut line = Vec::with_capacity(code.as_str().len() + 1);
        line.extend_from_slice(code.as_str().as_bytes());
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Pushes each code into an unbounded channel.
///
/// Handy for observing forwarded codes from another task.
#[derive(Clone)]
pub struct ChannelActuator {
    sender: mpsc::UnboundedSender<ActionCode>,
}

impl ChannelActuator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ActionCode>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ActuatorLink for ChannelActuator {
    async fn send(&self, code: &ActionCode) -> Result<(), ArbiterError> {
        self.sender
            .send(code.clone())
            .map_err(|_| ArbiterError::LinkClosed("receiver dropped".into()))
    }
}
