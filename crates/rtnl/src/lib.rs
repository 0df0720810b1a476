//! Async rtnetlink transport for Linux.
//!
//! This crate speaks NETLINK_ROUTE: it decodes kernel datagrams into typed
//! link, address, route, neighbor and namespace id messages, encodes them
//! back, and multiplexes multicast events with dump and ACK exchanges over
//! one socket.
//!
//! # Example
//!
//! ```ignore
//! use rtnl::netlink::{Transport, SocketConfig, request};
//!
//! #[tokio::main]
//! async fn main() -> rtnl::Result<()> {
//!     let mut transport = Transport::open(SocketConfig::default())?;
//!
//!     // Full-state resync, then follow events
//!     request::listen(&mut transport, |msg| {
//!         println!("{}", msg);
//!         Ok(())
//!     }, &[])
//!     .await?;
//!
//!     while let Some(msg) = transport.receive().await {
//!         println!("{}", msg);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Namespaces
//!
//! With `listen_all_nsid` on (the `SocketConfig` default), events from
//! peer namespaces arrive on the same socket and each message reports the
//! id of its namespace through `Message::nsid()`.

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::{Error, Message, Pool, Result, SocketConfig, Transport};
