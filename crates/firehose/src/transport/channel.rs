use crate::protocol::BoxError;
use crate::transport::{Transport, TransportEvent};
use bytes::Bytes;
use futures::channel::mpsc::{self, SendError};
use futures::{SinkExt, Stream, StreamExt};
use http::StatusCode;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Creates a [`ChannelTransport`] and the [`TransportSender`] feeding it.
///
/// The channel is bounded by `buffer`, so a sender pushing faster than the pipeline
/// consumes waits in [`TransportSender`]'s methods.
pub fn channel_transport(buffer: usize) -> (TransportSender, ChannelTransport) {
    let (sender, receiver) = mpsc::channel(buffer);
    (TransportSender { sender }, ChannelTransport { receiver })
}

/// Producer half of a [`ChannelTransport`], driven by the code owning the connection.
#[derive(Debug, Clone)]
pub struct TransportSender {
    sender: mpsc::Sender<Result<TransportEvent, BoxError>>,
}

impl TransportSender {
    pub async fn response(&mut self, status: StatusCode) -> Result<(), SendError> {
        self.sender.send(Ok(TransportEvent::Response(status))).await
    }

    pub async fn data<B: Into<Bytes>>(&mut self, bytes: B) -> Result<(), SendError> {
        self.sender.send(Ok(TransportEvent::Data(bytes.into()))).await
    }

    pub async fn error<E: Into<BoxError>>(&mut self, error: E) -> Result<(), SendError> {
        self.sender.send(Err(error.into())).await
    }

    /// Signals end of stream
    pub async fn close(&mut self) -> Result<(), SendError> {
        self.sender.close().await
    }

    /// Returns true once the pipeline aborted the transport or was dropped.
    ///
    /// The owner should then tear down its connection.
    pub fn is_aborted(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A [`Transport`] receiving its events from a [`TransportSender`].
#[derive(Debug)]
pub struct ChannelTransport {
    receiver: mpsc::Receiver<Result<TransportEvent, BoxError>>,
}

impl Stream for ChannelTransport {
    type Item = Result<TransportEvent, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl Transport for ChannelTransport {
    fn abort(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_and_receive() {
        let (mut sender, mut transport) = channel_transport(4);

        sender.response(StatusCode::OK).await.unwrap();
        sender.data(&b"{}\n"[..]).await.unwrap();
        sender.close().await.unwrap();

        assert_eq!(transport.next().await.unwrap().unwrap(), TransportEvent::Response(StatusCode::OK));
        assert_eq!(transport.next().await.unwrap().unwrap(), TransportEvent::Data(Bytes::from_static(b"{}\n")));
        assert!(transport.next().await.is_none());
    }

    #[tokio::test]
    async fn test_abort_is_visible_to_sender() {
        let (mut sender, mut transport) = channel_transport(4);
        assert!(!sender.is_aborted());

        transport.abort();

        assert!(sender.is_aborted());
        assert!(sender.data(&b"{}\n"[..]).await.is_err());
    }
}
