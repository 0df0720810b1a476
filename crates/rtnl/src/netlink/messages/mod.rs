//! Typed rtnetlink messages.
//!
//! [`Message`] is the closed set of messages the codec understands. The
//! link, address, route, neighbor and namespace id variants hold a pooled
//! struct with the fixed body and an [`AttrTable`] keyed by that message's
//! attribute kind enum:
//!
//! ```ignore
//! use rtnl::netlink::messages::IfInfoMessage;
//! use rtnl::netlink::types::link::IflaAttr;
//!
//! if let Message::IfInfo(link) = msg {
//!     let name = link.attr(IflaAttr::Ifname).and_then(Attr::as_str);
//!     println!("{} in nsid {}", name.unwrap_or("?"), link.nsid());
//! }
//! ```

use std::fmt;

use super::message::{NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NlMsgHdr, NlMsgType};
use super::pool::{Pool, Pooled};
use super::types::nsid::DEFAULT_NSID;

/// Generates the struct shared by the attribute-carrying messages: header,
/// effective namespace id, fixed body and attribute table.
macro_rules! rtnl_message {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            body: $body:ty,
            attrs: $kind:ty,
            family: $family:ident,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            header: $crate::netlink::message::NlMsgHdr,
            nsid: i32,
            body: $body,
            attrs: $crate::netlink::table::AttrTable<$kind>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    header: Default::default(),
                    nsid: $crate::netlink::types::nsid::DEFAULT_NSID,
                    body: Default::default(),
                    attrs: Default::default(),
                }
            }
        }

        impl $crate::netlink::pool::Poolable for $name {
            fn reset(&mut self) {
                self.header = Default::default();
                self.nsid = $crate::netlink::types::nsid::DEFAULT_NSID;
                self.body = Default::default();
                self.attrs.clear();
            }
        }

        impl $name {
            /// Create a message of `msg_type` with the given flags.
            pub fn new(msg_type: u16, flags: u16) -> Self {
                Self {
                    header: $crate::netlink::message::NlMsgHdr::new(msg_type, flags),
                    ..Self::default()
                }
            }

            pub fn header(&self) -> &$crate::netlink::message::NlMsgHdr {
                &self.header
            }

            pub fn header_mut(&mut self) -> &mut $crate::netlink::message::NlMsgHdr {
                &mut self.header
            }

            /// Effective namespace id, `DEFAULT_NSID` when the message
            /// arrived without one.
            pub fn nsid(&self) -> i32 {
                self.nsid
            }

            pub fn set_nsid(&mut self, nsid: i32) {
                self.nsid = nsid;
            }

            pub fn body(&self) -> &$body {
                &self.body
            }

            pub fn body_mut(&mut self) -> &mut $body {
                &mut self.body
            }

            /// Builder form of [`body_mut`](Self::body_mut).
            pub fn with_body(mut self, body: $body) -> Self {
                self.body = body;
                self
            }

            /// Address family of the fixed body.
            pub fn family(&self) -> u8 {
                self.body.$family
            }

            pub fn attrs(&self) -> &$crate::netlink::table::AttrTable<$kind> {
                &self.attrs
            }

            pub fn attrs_mut(&mut self) -> &mut $crate::netlink::table::AttrTable<$kind> {
                &mut self.attrs
            }

            pub fn attr(&self, kind: $kind) -> Option<&$crate::netlink::value::Attr> {
                self.attrs.attr(kind)
            }

            /// Store an attribute, returning the previous value.
            pub fn set(
                &mut self,
                kind: $kind,
                value: $crate::netlink::value::Attr,
            ) -> Option<$crate::netlink::value::Attr> {
                self.attrs.set(kind, value)
            }

            /// Builder form of [`set`](Self::set).
            pub fn with(mut self, kind: $kind, value: $crate::netlink::value::Attr) -> Self {
                self.attrs.set(kind, value);
                self
            }

            /// Decode the fixed body and the attribute table that follows it.
            pub(crate) fn decode_payload(
                &mut self,
                data: &[u8],
                pool: &$crate::netlink::pool::Pool,
            ) -> $crate::netlink::error::Result<()> {
                self.body = <$body>::from_bytes(data)?;
                let offset = $crate::netlink::message::nlmsg_align(std::mem::size_of::<$body>());
                let attrs = data.get(offset..).unwrap_or_default();
                let ctx = $crate::netlink::value::DecodeCtx::new(pool, self.family());
                self.attrs.decode(attrs, ctx)?;
                self.second_pass(ctx)
            }

            pub(crate) fn encode_payload(
                &self,
                b: &mut $crate::netlink::builder::MessageBuilder,
            ) -> $crate::netlink::error::Result<()> {
                b.append(&self.body);
                self.attrs.encode(b)
            }

            pub(crate) fn fmt_payload(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.attrs.fmt_indented(f, 1)
            }
        }
    };
}

mod addr;
mod control;
mod link;
mod neigh;
mod nsid;
mod route;

pub use addr::*;
pub use control::*;
pub use link::*;
pub use neigh::*;
pub use nsid::*;
pub use route::*;

/// A decoded netlink message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A GET request carrying only an address family.
    Generic(GenericMessage),
    Noop(NoopMessage),
    Done(DoneMessage),
    Error(ErrorMessage),
    /// RTM_NEWLINK, RTM_DELLINK, RTM_SETLINK.
    IfInfo(Pooled<IfInfoMessage>),
    /// RTM_NEWADDR, RTM_DELADDR.
    IfAddr(Pooled<IfAddrMessage>),
    /// RTM_NEWROUTE, RTM_DELROUTE.
    Route(Pooled<RouteMessage>),
    /// RTM_NEWNEIGH, RTM_DELNEIGH.
    Neighbor(Pooled<NeighborMessage>),
    /// RTM_NEWNSID, RTM_DELNSID, RTM_GETNSID.
    Netns(Pooled<NetnsMessage>),
}

macro_rules! each_variant {
    ($self:expr, $m:ident => $e:expr) => {
        match $self {
            Message::Generic($m) => $e,
            Message::Noop($m) => $e,
            Message::Done($m) => $e,
            Message::Error($m) => $e,
            Message::IfInfo($m) => $e,
            Message::IfAddr($m) => $e,
            Message::Route($m) => $e,
            Message::Neighbor($m) => $e,
            Message::Netns($m) => $e,
        }
    };
}

impl Message {
    /// Build a dump request for `msg_type` in `family`.
    pub fn dump_request(msg_type: u16, family: u8) -> Self {
        Message::Generic(GenericMessage::new(
            msg_type,
            NLM_F_REQUEST | NLM_F_DUMP,
            family,
        ))
    }

    pub fn header(&self) -> &NlMsgHdr {
        each_variant!(self, m => m.header())
    }

    pub fn header_mut(&mut self) -> &mut NlMsgHdr {
        each_variant!(self, m => m.header_mut())
    }

    pub fn msg_type(&self) -> u16 {
        self.header().nlmsg_type
    }

    pub fn nsid(&self) -> i32 {
        each_variant!(self, m => m.nsid())
    }

    pub fn set_nsid(&mut self, nsid: i32) {
        each_variant!(self, m => m.set_nsid(nsid))
    }

    /// Whether the message asks the kernel for an acknowledgement.
    pub fn wants_ack(&self) -> bool {
        self.header().nlmsg_flags & NLM_F_ACK != 0
    }

    /// An empty message of `msg_type`, `None` when the type is outside
    /// the supported set. Pooled variants are drawn from `pool`.
    pub(crate) fn empty(msg_type: u16, pool: &Pool) -> Option<Self> {
        let header = NlMsgHdr::new(msg_type, 0);
        let mut msg = match msg_type {
            NlMsgType::NOOP => Message::Noop(NoopMessage::default()),
            NlMsgType::DONE => Message::Done(DoneMessage::default()),
            NlMsgType::ERROR => Message::Error(ErrorMessage::default()),
            NlMsgType::RTM_GETLINK
            | NlMsgType::RTM_GETADDR
            | NlMsgType::RTM_GETROUTE
            | NlMsgType::RTM_GETNEIGH => Message::Generic(GenericMessage::default()),
            NlMsgType::RTM_NEWLINK | NlMsgType::RTM_DELLINK | NlMsgType::RTM_SETLINK => {
                Message::IfInfo(pool.acquire())
            }
            NlMsgType::RTM_NEWADDR | NlMsgType::RTM_DELADDR => Message::IfAddr(pool.acquire()),
            NlMsgType::RTM_NEWROUTE | NlMsgType::RTM_DELROUTE => Message::Route(pool.acquire()),
            NlMsgType::RTM_NEWNEIGH | NlMsgType::RTM_DELNEIGH => {
                Message::Neighbor(pool.acquire())
            }
            NlMsgType::RTM_NEWNSID | NlMsgType::RTM_DELNSID | NlMsgType::RTM_GETNSID => {
                Message::Netns(pool.acquire())
            }
            _ => return None,
        };
        *msg.header_mut() = header;
        Some(msg)
    }
}

impl From<IfInfoMessage> for Message {
    fn from(m: IfInfoMessage) -> Self {
        Message::IfInfo(Pooled::detached(m))
    }
}

impl From<IfAddrMessage> for Message {
    fn from(m: IfAddrMessage) -> Self {
        Message::IfAddr(Pooled::detached(m))
    }
}

impl From<RouteMessage> for Message {
    fn from(m: RouteMessage) -> Self {
        Message::Route(Pooled::detached(m))
    }
}

impl From<NeighborMessage> for Message {
    fn from(m: NeighborMessage) -> Self {
        Message::Neighbor(Pooled::detached(m))
    }
}

impl From<NetnsMessage> for Message {
    fn from(m: NetnsMessage) -> Self {
        Message::Netns(Pooled::detached(m))
    }
}

impl From<GenericMessage> for Message {
    fn from(m: GenericMessage) -> Self {
        Message::Generic(m)
    }
}

impl From<ErrorMessage> for Message {
    fn from(m: ErrorMessage) -> Self {
        Message::Error(m)
    }
}

impl From<DoneMessage> for Message {
    fn from(m: DoneMessage) -> Self {
        Message::Done(m)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())?;
        if self.nsid() != DEFAULT_NSID {
            write!(f, " nsid {}", self.nsid())?;
        }
        match self {
            Message::Generic(m) => write!(f, "\n    family: {}", m.family()),
            Message::Noop(_) => Ok(()),
            Message::Done(m) if m.error() != 0 => write!(f, "\n    error: {}", m.error()),
            Message::Done(_) => Ok(()),
            Message::Error(m) => write!(f, "\n    error: {}\n    request: {}", m.error(), m.request()),
            Message::IfInfo(m) => {
                let b = m.body();
                write!(
                    f,
                    "\n    ifinfo: family {} type {} index {} flags {:#x}",
                    b.ifi_family, b.ifi_type, b.ifi_index, b.ifi_flags
                )?;
                m.fmt_payload(f)
            }
            Message::IfAddr(m) => {
                let b = m.body();
                write!(
                    f,
                    "\n    ifaddr: family {} prefixlen {} flags {:#x} scope {} index {}",
                    b.ifa_family, b.ifa_prefixlen, b.ifa_flags, b.ifa_scope, b.ifa_index
                )?;
                m.fmt_payload(f)
            }
            Message::Route(m) => {
                let b = m.body();
                write!(
                    f,
                    "\n    rtmsg: family {} dst_len {} src_len {} table {} protocol {} scope {} type {}",
                    b.rtm_family,
                    b.rtm_dst_len,
                    b.rtm_src_len,
                    b.rtm_table,
                    b.rtm_protocol,
                    b.rtm_scope,
                    b.rtm_type
                )?;
                m.fmt_payload(f)
            }
            Message::Neighbor(m) => {
                let b = m.body();
                write!(
                    f,
                    "\n    ndmsg: family {} index {} state {} flags {:#x} type {}",
                    b.ndm_family,
                    b.ndm_ifindex,
                    super::types::neigh::nud_state_name(b.ndm_state),
                    b.ndm_flags,
                    b.ndm_type
                )?;
                m.fmt_payload(f)
            }
            Message::Netns(m) => {
                write!(f, "\n    rtgenmsg: family {}", m.family())?;
                m.fmt_payload(f)
            }
        }
    }
}
