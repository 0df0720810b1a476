//! Ids of named network namespaces.
//!
//! Named namespaces are the files `ip netns add` bind-mounts under
//! [`NETNS_RUN_DIR`]. The kernel identifies a namespace in `RTM_*NSID`
//! requests by an open file descriptor carried in `NETNSA_FD`, so each
//! call keeps the file open until the reply has arrived.
//!
//! ```ignore
//! use rtnl::netlink::{netns, Transport, groups};
//!
//! let mut transport = Transport::open_groups(&[groups::NOOP])?;
//! for name in netns::list_named()? {
//!     let id = netns::get_nsid(&mut transport, &name).await?;
//!     println!("{} {:?}", name, id);
//! }
//! ```

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use tracing::debug;

use super::error::{Error, Result};
use super::message::{NLM_F_REQUEST, NlMsgType};
use super::messages::{Message, NetnsMessage};
use super::request::request_ack;
use super::transport::Transport;
use super::types::nsid::NetnsAttr;
use super::value::Attr;

/// The runtime directory where named network namespaces are stored.
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// Names under [`NETNS_RUN_DIR`], sorted. A missing directory means no
/// named namespaces.
pub fn list_named() -> Result<Vec<String>> {
    let dir = match std::fs::read_dir(NETNS_RUN_DIR) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut names = Vec::new();
    for entry in dir {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn open_named(name: &str) -> Result<File> {
    let path = PathBuf::from(NETNS_RUN_DIR).join(name);
    File::open(&path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NamespaceNotFound {
            name: name.to_string(),
        },
        _ => Error::Io(e),
    })
}

fn fd_attr(file: &File) -> Attr {
    Attr::U32(file.as_raw_fd() as u32)
}

/// Id the kernel has assigned to namespace `name`, `None` if unassigned.
pub async fn get_nsid(transport: &mut Transport, name: &str) -> Result<Option<i32>> {
    let file = open_named(name)?;
    let req = NetnsMessage::new(NlMsgType::RTM_GETNSID, NLM_F_REQUEST)
        .with(NetnsAttr::Fd, fd_attr(&file));
    transport.send(req.into()).await?;

    let result = loop {
        match transport.receive().await {
            Some(Message::Netns(reply)) => break Ok(reply.id()),
            Some(Message::Error(err)) => {
                break match err.to_error() {
                    Some(e) => Err(e),
                    None => Ok(None),
                };
            }
            Some(other) => debug!(msg_type = other.msg_type(), "ignoring message"),
            None => break Err(Error::Closed),
        }
    };
    drop(file);
    result
}

/// Assign `id` to namespace `name`.
pub async fn set_nsid(transport: &mut Transport, name: &str, id: i32) -> Result<()> {
    let file = open_named(name)?;
    let req = NetnsMessage::new(NlMsgType::RTM_NEWNSID, NLM_F_REQUEST)
        .with(NetnsAttr::Fd, fd_attr(&file))
        .with(NetnsAttr::Nsid, Attr::I32(id));
    let result = request_ack(transport, req.into(), ignore).await;
    drop(file);
    result
}

/// Remove the id of namespace `name`.
pub async fn unset_nsid(transport: &mut Transport, name: &str) -> Result<()> {
    let file = open_named(name)?;
    let req = NetnsMessage::new(NlMsgType::RTM_DELNSID, NLM_F_REQUEST)
        .with(NetnsAttr::Fd, fd_attr(&file));
    let result = request_ack(transport, req.into(), ignore).await;
    drop(file);
    result
}

fn ignore(msg: Message) -> Result<()> {
    debug!(msg_type = msg.msg_type(), "ignoring message");
    Ok(())
}
