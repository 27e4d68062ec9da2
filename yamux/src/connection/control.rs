use super::stream::Stream;
use super::ControlCommand;
use futures::channel::{mpsc, oneshot};
use futures::SinkExt;
use libp2prs_core::error::{CoreError, LifecycleError};

/// A cheaply-cloneable handle used to open outbound streams, accept inbound
/// ones, and close a [`super::Connection`] from outside its driving task.
#[derive(Clone)]
pub struct Control {
    sender: mpsc::Sender<ControlCommand>,
}

impl Control {
    pub(crate) fn new(sender: mpsc::Sender<ControlCommand>) -> Self {
        Control { sender }
    }

    pub async fn open_stream(&mut self) -> Result<Stream, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControlCommand::OpenStream(tx))
            .await
            .map_err(|_| CoreError::Lifecycle(LifecycleError::ConnectionClosed { is_reset: false }))?;
        rx.await.map_err(|_| CoreError::Lifecycle(LifecycleError::ConnectionClosed { is_reset: false }))?
    }

    pub async fn accept_stream(&mut self) -> Result<Stream, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControlCommand::AcceptStream(tx))
            .await
            .map_err(|_| CoreError::Lifecycle(LifecycleError::ConnectionClosed { is_reset: false }))?;
        rx.await.map_err(|_| CoreError::Lifecycle(LifecycleError::ConnectionClosed { is_reset: false }))?
    }

    pub async fn close(&mut self) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(ControlCommand::Close(tx)).await.is_err() {
            return Ok(()); // already gone, close() is idempotent
        }
        let _ = rx.await;
        Ok(())
    }
}
