//! Duplex message transport over a netlink socket.
//!
//! A [`Transport`] owns two background tasks:
//!
//! - the receive task reads datagrams, splits them into frames, decodes
//!   each frame, tags it with the namespace id from the control data and
//!   pushes it onto the inbound queue in kernel order;
//! - the transmit task pulls from the outbound queue, fills in default
//!   header fields, encodes and writes. When a message cannot be encoded
//!   or written, an `NLMSG_ERROR` carrying the errno and the failed
//!   request header is pushed onto the inbound queue instead, so a caller
//!   waiting for the reply sees the failure.
//!
//! Both queues are bounded; a full queue suspends its producer.
//!
//! # Example
//!
//! ```ignore
//! use rtnl::netlink::{Transport, SocketConfig, LINK_GROUPS};
//!
//! let mut transport = Transport::open(SocketConfig::new().groups(LINK_GROUPS))?;
//! while let Some(msg) = transport.receive().await {
//!     println!("{}", msg);
//! }
//! ```

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use bytes::BytesMut;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use super::codec;
use super::config::SocketConfig;
use super::error::{Error, Result};
use super::message::{MessageIter, NLM_F_REQUEST};
use super::messages::{ErrorMessage, Message};
use super::pool::Pool;
use super::socket::{NetlinkSocket, Wire};
use super::stream::{MessageStream, Messages};
use super::types::nsid::DEFAULT_NSID;

/// Consecutive hard receive errors tolerated before the receive task gives
/// up.
const MAX_RX_FAILURES: u32 = 3;

/// Receive buffer size in pages; control data gets one more page.
const RX_BUFFER_PAGES: usize = 4;

/// Clonable handle onto a transport's outbound queue.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::Sender<Message>,
}

impl Outbound {
    /// Enqueue `msg`, waiting while the queue is full.
    pub async fn send(&self, msg: Message) -> Result<()> {
        self.tx.send(msg).await.map_err(|_| Error::Closed)
    }

    /// Enqueue `msg` without waiting.
    pub fn try_send(&self, msg: Message) -> Result<()> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Error::Closed,
        })
    }

    /// Whether the transmit task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// An open rtnetlink transport.
///
/// Inbound messages are taken with [`receive`](Self::receive) or by using
/// the transport as a [`Stream`](tokio_stream::Stream). Both need
/// `&mut self`, so only one consumer reads at a time.
pub struct Transport {
    inbound: mpsc::Receiver<Message>,
    outbound: Outbound,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    port_id: u32,
    pool: Pool,
    seq: Arc<AtomicU32>,
}

impl Transport {
    /// Open a kernel socket as `config` describes and start the tasks.
    ///
    /// Must be called inside a tokio runtime.
    pub fn open(config: SocketConfig) -> Result<Self> {
        let socket = NetlinkSocket::open(&config)?;
        Ok(Self::with_wire(socket, &config, Pool::new()))
    }

    /// Open on `groups` with default buffers and without namespace id
    /// tagging.
    pub fn open_groups(groups: &[u32]) -> Result<Self> {
        Self::open(SocketConfig::new().groups(groups).listen_all_nsid(false))
    }

    /// Start a transport over any [`Wire`]. Queue capacities come from
    /// `config`; its socket options are ignored.
    pub fn with_wire<W: Wire>(wire: W, config: &SocketConfig, pool: Pool) -> Self {
        let wire = Arc::new(wire);
        let port_id = wire.port_id();
        let (inbound_tx, inbound) = mpsc::channel(config.rx_capacity());
        let (outbound_tx, outbound_rx) = mpsc::channel(config.tx_capacity());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let seq = Arc::new(AtomicU32::new(1));

        let tx_task = tokio::spawn(tx_loop(
            wire.clone(),
            outbound_rx,
            inbound_tx.downgrade(),
            shutdown_rx.clone(),
            seq.clone(),
        ));
        let rx_task = tokio::spawn(rx_loop(wire, pool.clone(), inbound_tx, shutdown_rx));
        debug!(port_id, "transport started");

        Self {
            inbound,
            outbound: Outbound { tx: outbound_tx },
            shutdown,
            tasks: vec![rx_task, tx_task],
            port_id,
            pool,
            seq,
        }
    }

    /// Port id the socket is bound to.
    pub fn port_id(&self) -> u32 {
        self.port_id
    }

    /// Pool inbound messages are drawn from.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Reserve the next sequence number, the same counter the transmit
    /// task uses for messages sent with sequence 0.
    pub fn next_seq(&self) -> u32 {
        next_seq(&self.seq)
    }

    /// Enqueue `msg`, waiting while the outbound queue is full.
    pub async fn send(&self, msg: Message) -> Result<()> {
        self.outbound.send(msg).await
    }

    /// Enqueue `msg` without waiting; `QueueFull` when there is no room.
    pub fn try_send(&self, msg: Message) -> Result<()> {
        self.outbound.try_send(msg)
    }

    /// A handle other tasks can send through.
    pub fn sender(&self) -> Outbound {
        self.outbound.clone()
    }

    /// Next inbound message, `None` once the receive task has stopped and
    /// the queue is drained.
    pub async fn receive(&mut self) -> Option<Message> {
        self.inbound.recv().await
    }

    /// Poll form of [`receive`](Self::receive), used by the streams.
    pub(crate) fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.inbound.poll_recv(cx)
    }

    /// Borrow the inbound side as a stream.
    pub fn messages(&mut self) -> Messages<'_> {
        Messages::new(self)
    }

    /// Turn the transport into an owned stream of inbound messages.
    pub fn into_stream(self) -> MessageStream {
        MessageStream::new(self)
    }

    /// Stop both tasks and wait for them. The socket is released once
    /// both have returned. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        self.shutdown.send_replace(true);
        // Unblocks a task waiting on a full inbound queue.
        self.inbound.close();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "transport task failed");
            }
        }
        debug!(port_id = self.port_id, "transport closed");
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("port_id", &self.port_id)
            .field("running", &!self.tasks.is_empty())
            .finish_non_exhaustive()
    }
}

fn next_seq(seq: &AtomicU32) -> u32 {
    loop {
        let n = seq.fetch_add(1, Ordering::Relaxed);
        if n != 0 {
            return n;
        }
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(n).ok().filter(|&n| n > 0).unwrap_or(4096)
}

async fn rx_loop<W: Wire>(
    wire: Arc<W>,
    pool: Pool,
    inbound: mpsc::Sender<Message>,
    mut shutdown: watch::Receiver<bool>,
) {
    let page = page_size();
    let mut buf = BytesMut::zeroed(RX_BUFFER_PAGES * page);
    let mut oob = BytesMut::zeroed(page);
    let mut failures = 0u32;

    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            r = wire.recv(&mut buf, &mut oob) => r,
        };

        let datagram = match received {
            Ok(d) if d.len > 0 => {
                failures = 0;
                d
            }
            Ok(_) => {
                failures += 1;
                warn!("empty netlink datagram");
                if failures > MAX_RX_FAILURES {
                    error!(failures, "netlink receive failing, stopping");
                    break;
                }
                continue;
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
                continue;
            }
            Err(e) => {
                failures += 1;
                // EINVAL shows up while the socket is torn down.
                if e.raw_os_error() != Some(libc::EINVAL) {
                    warn!(error = %e, "netlink receive failed");
                }
                if failures > MAX_RX_FAILURES {
                    error!(error = %e, failures, "netlink receive failing, stopping");
                    break;
                }
                continue;
            }
        };

        let nsid = datagram.nsid.unwrap_or(DEFAULT_NSID);
        let len = datagram.len.min(buf.len());
        for frame in MessageIter::new(&buf[..len]) {
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    warn!(error = %e, "malformed netlink frame, dropping rest of datagram");
                    break;
                }
            };
            let mut msg = match codec::decode(frame, &pool) {
                Ok(m) => m,
                Err(Error::UnsupportedMessageType(t)) => {
                    debug!(msg_type = t, "skipping unsupported message");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "dropping undecodable message");
                    continue;
                }
            };
            msg.set_nsid(nsid);
            trace!(msg_type = msg.msg_type(), nsid, "rx");
            if inbound.send(msg).await.is_err() {
                return;
            }
        }
    }
}

async fn tx_loop<W: Wire>(
    wire: Arc<W>,
    mut outbound: mpsc::Receiver<Message>,
    inbound: mpsc::WeakSender<Message>,
    mut shutdown: watch::Receiver<bool>,
    seq: Arc<AtomicU32>,
) {
    let port_id = wire.port_id();
    let mut buf = Vec::with_capacity(page_size());

    loop {
        let mut msg = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            m = outbound.recv() => match m {
                Some(m) => m,
                None => break,
            },
        };

        let header = msg.header_mut();
        if header.nlmsg_flags == 0 {
            header.nlmsg_flags = NLM_F_REQUEST;
        }
        if header.nlmsg_pid == 0 {
            header.nlmsg_pid = port_id;
        }
        if header.nlmsg_seq == 0 {
            header.nlmsg_seq = next_seq(&seq);
        }

        let errno = match codec::encode_into(&msg, &mut buf) {
            Err(e) => {
                warn!(error = %e, msg_type = msg.msg_type(), "cannot encode message");
                libc::EINVAL
            }
            Ok(()) => {
                trace!(msg_type = msg.msg_type(), seq = msg.header().nlmsg_seq, "tx");
                let sent = tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    r = wire.send(&buf) => r,
                };
                match sent {
                    Ok(()) => continue,
                    Err(e) => {
                        warn!(error = %e, msg_type = msg.msg_type(), "netlink send failed");
                        e.raw_os_error().unwrap_or(libc::EIO)
                    }
                }
            }
        };

        let report = Message::Error(ErrorMessage::new(-errno, *msg.header()));
        let Some(inbound) = inbound.upgrade() else {
            break;
        };
        if inbound.send(report).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_skips_zero() {
        let seq = AtomicU32::new(u32::MAX);
        assert_eq!(next_seq(&seq), u32::MAX);
        assert_eq!(next_seq(&seq), 1);
        assert_eq!(next_seq(&seq), 2);
    }

    #[test]
    fn test_page_size() {
        let page = page_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
    }
}
