//! Dump and acknowledged-request exchanges over a [`Transport`].
//!
//! An exchange sends one request and then reads the inbound queue until a
//! terminal message arrives: `NLMSG_DONE` for a dump, or `NLMSG_ERROR`
//! (an ACK when its errno is 0). Every other message, whether part of the
//! reply or an unrelated multicast event, goes to the caller's handler in
//! arrival order.
//!
//! Replies are not matched by sequence number, so only one exchange may be
//! outstanding per transport. Taking `&mut Transport` keeps it that way.
//!
//! ```ignore
//! use rtnl::netlink::{request, Message, NlMsgType, Transport, af};
//!
//! let mut links = Vec::new();
//! request::request_dump(&mut transport, NlMsgType::RTM_GETLINK, af::UNSPEC, |msg| {
//!     if let Message::IfInfo(link) = msg {
//!         links.push(link);
//!     }
//!     Ok(())
//! })
//! .await?;
//! ```

use tracing::{debug, warn};

use super::error::{Error, Result};
use super::message::{NLM_F_ACK, NLM_F_MATCH, NLM_F_REQUEST, NlMsgType};
use super::messages::{GenericMessage, Message};
use super::transport::Transport;
use super::types::af;

/// Attempts per request in [`listen`].
pub const LISTEN_ATTEMPTS: u32 = 5;

/// One dump in a resynchronization sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenReq {
    pub msg_type: u16,
    pub family: u8,
}

impl ListenReq {
    pub const fn new(msg_type: u16, family: u8) -> Self {
        Self { msg_type, family }
    }
}

/// Placeholder entry; [`listen`] skips it.
pub const NOOP_LISTEN_REQ: ListenReq = ListenReq::new(NlMsgType::NOOP, af::UNSPEC);

pub const NSID_LISTEN_REQS: &[ListenReq] = &[ListenReq::new(NlMsgType::RTM_GETNSID, af::UNSPEC)];

pub const LINK_LISTEN_REQS: &[ListenReq] = &[ListenReq::new(NlMsgType::RTM_GETLINK, af::PACKET)];

pub const ADDR_LISTEN_REQS: &[ListenReq] = &[
    ListenReq::new(NlMsgType::RTM_GETADDR, af::INET),
    ListenReq::new(NlMsgType::RTM_GETADDR, af::INET6),
];

pub const NEIGHBOR_LISTEN_REQS: &[ListenReq] = &[
    ListenReq::new(NlMsgType::RTM_GETNEIGH, af::INET),
    ListenReq::new(NlMsgType::RTM_GETNEIGH, af::INET6),
];

pub const ROUTE_LISTEN_REQS: &[ListenReq] = &[
    ListenReq::new(NlMsgType::RTM_GETROUTE, af::INET),
    ListenReq::new(NlMsgType::RTM_GETROUTE, af::INET6),
];

/// Full-state resync: namespace ids first, then links, so that later
/// objects can be resolved against both.
pub const DEFAULT_LISTEN_REQS: &[ListenReq] = &[
    ListenReq::new(NlMsgType::RTM_GETNSID, af::UNSPEC),
    ListenReq::new(NlMsgType::RTM_GETLINK, af::PACKET),
    ListenReq::new(NlMsgType::RTM_GETADDR, af::INET),
    ListenReq::new(NlMsgType::RTM_GETADDR, af::INET6),
    ListenReq::new(NlMsgType::RTM_GETNEIGH, af::INET),
    ListenReq::new(NlMsgType::RTM_GETNEIGH, af::INET6),
    ListenReq::new(NlMsgType::RTM_GETROUTE, af::INET),
    ListenReq::new(NlMsgType::RTM_GETROUTE, af::INET6),
];

/// Send a dump request for `msg_type` in `family` and feed every message
/// to `handler` until the dump ends.
pub async fn request_dump<F>(
    transport: &mut Transport,
    msg_type: u16,
    family: u8,
    handler: F,
) -> Result<()>
where
    F: FnMut(Message) -> Result<()>,
{
    transport
        .send(Message::dump_request(msg_type, family))
        .await?;
    rx_until_done(transport, handler).await
}

/// Read inbound messages into `handler` until `NLMSG_DONE` or
/// `NLMSG_ERROR`.
///
/// A non-zero error code in either terminal message is returned as a
/// kernel error. An error from `handler` stops the loop and is returned.
/// `Closed` if the transport stops first.
pub async fn rx_until_done<F>(transport: &mut Transport, mut handler: F) -> Result<()>
where
    F: FnMut(Message) -> Result<()>,
{
    while let Some(msg) = transport.receive().await {
        match msg {
            Message::Done(done) => {
                return match done.error() {
                    0 => Ok(()),
                    errno => Err(Error::from_errno(errno)),
                };
            }
            Message::Error(err) => {
                return match err.to_error() {
                    None => Ok(()),
                    Some(e) => Err(e),
                };
            }
            other => handler(other)?,
        }
    }
    Err(Error::Closed)
}

/// Send `msg` with `NLM_F_ACK` set and wait for the acknowledgement.
/// Messages arriving in the meantime go to `handler`.
pub async fn request_ack<F>(transport: &mut Transport, mut msg: Message, handler: F) -> Result<()>
where
    F: FnMut(Message) -> Result<()>,
{
    let header = msg.header_mut();
    header.nlmsg_flags |= NLM_F_REQUEST | NLM_F_ACK;
    transport.send(msg).await?;
    rx_until_done(transport, handler).await
}

/// Ask for every link without waiting for the replies; they arrive on the
/// inbound queue like events.
pub async fn getlink_request(transport: &Transport) -> Result<()> {
    let req = GenericMessage::new(
        NlMsgType::RTM_GETLINK,
        NLM_F_REQUEST | NLM_F_MATCH,
        af::UNSPEC,
    );
    transport.send(req.into()).await
}

/// Run each dump in `reqs` in order, feeding all messages to `handler`.
///
/// An empty list means [`DEFAULT_LISTEN_REQS`]. A failed dump is retried
/// up to [`LISTEN_ATTEMPTS`] times before its error is returned.
pub async fn listen<F>(transport: &mut Transport, mut handler: F, reqs: &[ListenReq]) -> Result<()>
where
    F: FnMut(Message) -> Result<()>,
{
    let reqs = if reqs.is_empty() {
        DEFAULT_LISTEN_REQS
    } else {
        reqs
    };

    for req in reqs {
        if req.msg_type == NlMsgType::NOOP {
            continue;
        }
        let mut attempt = 1;
        loop {
            match request_dump(transport, req.msg_type, req.family, &mut handler).await {
                Ok(()) => break,
                Err(Error::Closed) => return Err(Error::Closed),
                Err(e) if attempt >= LISTEN_ATTEMPTS => return Err(e),
                Err(e) => {
                    warn!(
                        msg_type = NlMsgType::name(req.msg_type),
                        family = req.family,
                        attempt,
                        error = %e,
                        "dump failed, retrying"
                    );
                    attempt += 1;
                }
            }
        }
        debug!(msg_type = NlMsgType::name(req.msg_type), family = req.family, "dump complete");
    }
    Ok(())
}
