//! [`Stream`] views of a transport's inbound queue.
//!
//! - [`Transport::messages()`] returns a borrowed stream; the transport can
//!   still send while it is alive.
//! - [`Transport::into_stream()`] consumes the transport and returns an
//!   owned stream.
//!
//! # Example
//!
//! ```ignore
//! use rtnl::netlink::{Transport, NSID_GROUPS};
//! use tokio_stream::StreamExt;
//!
//! let mut events = Transport::open_groups(NSID_GROUPS)?.into_stream();
//! while let Some(msg) = events.next().await {
//!     println!("{}", msg);
//! }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio_stream::Stream;

use super::messages::Message;
use super::transport::Transport;

/// A stream of inbound messages that borrows the transport.
///
/// Created by [`Transport::messages()`].
pub struct Messages<'a> {
    transport: &'a mut Transport,
}

impl<'a> Messages<'a> {
    pub(crate) fn new(transport: &'a mut Transport) -> Self {
        Self { transport }
    }
}

impl Stream for Messages<'_> {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().transport.poll_recv(cx)
    }
}

/// A stream of inbound messages that owns the transport.
///
/// Created by [`Transport::into_stream()`]. Ends when the receive task
/// stops.
pub struct MessageStream {
    transport: Transport,
}

impl MessageStream {
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Consume this stream and return the underlying transport.
    pub fn into_transport(self) -> Transport {
        self.transport
    }
}

impl Stream for MessageStream {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().transport.poll_recv(cx)
    }
}
