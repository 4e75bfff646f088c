use crate::protocol::BoxError;
use crate::transport::{Transport, TransportEvent};
use bytes::Bytes;
use futures::Stream;
use http::{Response, StatusCode};
use http_body::Body;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::trace;

/// A [`Transport`] over an `http::Response` whose body streams the firehose.
///
/// The response status is reported first, then each data frame of the body. Trailer
/// frames are skipped. Aborting drops the body, which closes the connection in any
/// http client that ties the connection to the body's lifetime.
#[derive(Debug)]
pub struct ResponseTransport<B> {
    status: Option<StatusCode>,
    body: Option<B>,
}

impl<B> ResponseTransport<B> {
    pub fn new(response: Response<B>) -> Self {
        let (parts, body) = response.into_parts();
        Self { status: Some(parts.status), body: Some(body) }
    }
}

impl<B> From<Response<B>> for ResponseTransport<B> {
    fn from(response: Response<B>) -> Self {
        Self::new(response)
    }
}

impl<B> Stream for ResponseTransport<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Item = Result<TransportEvent, BoxError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(status) = this.status.take() {
            return Poll::Ready(Some(Ok(TransportEvent::Response(status))));
        }

        loop {
            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(Pin::new(body).poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => return Poll::Ready(Some(Ok(TransportEvent::Data(data)))),
                    Err(_trailers) => {
                        trace!("skip trailer frame of streaming response");
                        continue;
                    }
                },
                Some(Err(e)) => {
                    this.body = None;
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => {
                    this.body = None;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<B> Transport for ResponseTransport<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    fn abort(&mut self) {
        self.status = None;
        if self.body.take().is_some() {
            trace!("dropped streaming response body");
        }
    }
}
