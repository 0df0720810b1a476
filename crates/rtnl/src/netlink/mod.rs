//! Async rtnetlink transport for Linux.
//!
//! Layers, bottom up:
//!
//! - [`message`], [`attr`], [`builder`]: netlink framing, TLV attributes
//!   and alignment.
//! - [`types`]: fixed kernel bodies and per-table attribute kinds.
//! - [`value`], [`table`], [`messages`]: typed attribute values and the
//!   [`Message`] enum.
//! - [`codec`]: frame decode/encode.
//! - [`pool`]: recycling of decoded messages and nested arrays.
//! - [`socket`], [`transport`], [`stream`]: the kernel socket and the
//!   receive/transmit tasks around it.
//! - [`request`]: dump and ACK exchanges, full-state resync.
//! - [`netns`]: ids of named network namespaces.
//!
//! # Quick Start
//!
//! ```ignore
//! use rtnl::netlink::{Message, NlMsgType, SocketConfig, Transport, af, request};
//!
//! let mut transport = Transport::open(SocketConfig::default())?;
//!
//! // Dump links, then keep reading events
//! request::request_dump(&mut transport, NlMsgType::RTM_GETLINK, af::UNSPEC, |msg| {
//!     println!("{}", msg);
//!     Ok(())
//! })
//! .await?;
//!
//! while let Some(msg) = transport.receive().await {
//!     if let Message::IfInfo(link) = &msg {
//!         println!("{} {:?}", link.index(), link.name());
//!     }
//! }
//! ```

pub mod attr;
pub mod builder;
pub mod codec;
pub mod config;
mod error;
pub mod message;
pub mod messages;
pub mod netns;
pub mod pool;
pub mod request;
pub mod socket;
pub mod stream;
pub mod table;
pub mod transport;
pub mod types;
pub mod value;

pub use attr::{AttrIter, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use config::{
    ADDR_GROUPS, DEFAULT_GROUPS, DEFAULT_MESSAGES, LINK_GROUPS, NEIGHBOR_GROUPS, NSID_GROUPS,
    ROUTE_GROUPS, SocketConfig, groups,
};
pub use error::{Error, Result};
pub use message::{
    MessageIter, NLM_F_ACK, NLM_F_DUMP, NLM_F_MULTI, NLM_F_REQUEST, NLMSG_HDRLEN, NlMsgHdr,
    NlMsgType,
};
pub use messages::Message;
pub use pool::{Pool, Poolable, Pooled};
pub use request::{DEFAULT_LISTEN_REQS, ListenReq};
pub use socket::{Datagram, NetlinkSocket, Wire};
pub use stream::{MessageStream, Messages};
pub use table::AttrTable;
pub use transport::{Outbound, Transport};
pub use types::af;
pub use types::nsid::DEFAULT_NSID;
pub use value::{Attr, AttrArray, EthernetAddr};
