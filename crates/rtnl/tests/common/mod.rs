//! Common test utilities.
//!
//! Provides `FakeKernel`, an in-memory [`Wire`] the transport tasks run
//! over, frame builders for kernel replies, and helper macros for tests
//! that need a real netlink socket.

#![allow(dead_code)]

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use rtnl::netlink::codec;
use rtnl::netlink::messages::{DoneMessage, ErrorMessage, IfAddrMessage, IfInfoMessage};
use rtnl::netlink::types::addr::{IfAddrMsg, IfaAttr};
use rtnl::netlink::types::link::{IfInfoMsg, IflaAttr};
use rtnl::netlink::{
    Attr, Datagram, Message, NLM_F_MULTI, NlMsgHdr, NlMsgType, Pool, SocketConfig, Transport,
    Wire, af,
};
use tokio::sync::{Mutex, mpsc};

/// Port id the fake kernel reports.
pub const FAKE_PORT_ID: u32 = 4242;

/// Upper bound for any single await in these tests.
pub const TIMEOUT: Duration = Duration::from_secs(5);

type Delivery = io::Result<(Vec<u8>, Option<i32>)>;

/// Kernel side of a [`Transport`] under test.
pub struct FakeKernel {
    deliveries: Mutex<mpsc::UnboundedReceiver<Delivery>>,
    sent: mpsc::UnboundedSender<Vec<u8>>,
    send_errno: Arc<AtomicI32>,
}

/// Test side of a [`FakeKernel`]: queue datagrams, read what was sent.
pub struct KernelHandle {
    deliveries: mpsc::UnboundedSender<Delivery>,
    sent: mpsc::UnboundedReceiver<Vec<u8>>,
    send_errno: Arc<AtomicI32>,
}

impl FakeKernel {
    pub fn new() -> (Self, KernelHandle) {
        let (deliver_tx, deliver_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let send_errno = Arc::new(AtomicI32::new(0));
        let kernel = Self {
            deliveries: Mutex::new(deliver_rx),
            sent: sent_tx,
            send_errno: send_errno.clone(),
        };
        let handle = KernelHandle {
            deliveries: deliver_tx,
            sent: sent_rx,
            send_errno,
        };
        (kernel, handle)
    }
}

impl Wire for FakeKernel {
    fn port_id(&self) -> u32 {
        FAKE_PORT_ID
    }

    async fn recv(&self, buf: &mut [u8], _oob: &mut [u8]) -> io::Result<Datagram> {
        let mut deliveries = self.deliveries.lock().await;
        match deliveries.recv().await {
            Some(Ok((data, nsid))) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(Datagram { len, nsid })
            }
            Some(Err(e)) => Err(e),
            // Test dropped its handle: behave like an idle socket.
            None => std::future::pending().await,
        }
    }

    async fn send(&self, buf: &[u8]) -> io::Result<()> {
        let errno = self.send_errno.load(Ordering::SeqCst);
        if errno != 0 {
            return Err(io::Error::from_raw_os_error(errno));
        }
        let _ = self.sent.send(buf.to_vec());
        Ok(())
    }
}

impl KernelHandle {
    /// Deliver one datagram made of `frames` packed back to back.
    pub fn deliver(&self, frames: &[Vec<u8>]) {
        self.deliver_nsid(frames, None);
    }

    /// Deliver one datagram with namespace id control data.
    pub fn deliver_nsid(&self, frames: &[Vec<u8>], nsid: Option<i32>) {
        let data: Vec<u8> = frames.concat();
        let _ = self.deliveries.send(Ok((data, nsid)));
    }

    /// Make the next receive fail with `err`.
    pub fn fail_recv(&self, err: io::Error) {
        let _ = self.deliveries.send(Err(err));
    }

    /// Make every send fail with `errno` (0 to stop failing).
    pub fn fail_sends(&self, errno: i32) {
        self.send_errno.store(errno, Ordering::SeqCst);
    }

    /// Next datagram the transport wrote, decoded.
    pub async fn next_sent(&mut self) -> Message {
        let bytes = tokio::time::timeout(TIMEOUT, self.sent.recv())
            .await
            .expect("timed out waiting for a send")
            .expect("fake kernel dropped");
        codec::decode(&bytes, &Pool::new()).expect("transport sent an undecodable message")
    }

    /// Number of datagrams written so far that have not been read.
    pub fn pending_sent(&mut self) -> usize {
        let mut n = 0;
        while self.sent.try_recv().is_ok() {
            n += 1;
        }
        n
    }
}

/// A transport over a fresh fake kernel.
pub fn fake_transport() -> (Transport, KernelHandle) {
    fake_transport_with(&SocketConfig::default())
}

pub fn fake_transport_with(config: &SocketConfig) -> (Transport, KernelHandle) {
    let (kernel, handle) = FakeKernel::new();
    (Transport::with_wire(kernel, config, Pool::new()), handle)
}

fn encode(msg: Message) -> Vec<u8> {
    codec::encode_to_vec(&msg).expect("encode")
}

fn reply_header(header: &mut NlMsgHdr, seq: u32) {
    header.nlmsg_seq = seq;
    header.nlmsg_pid = FAKE_PORT_ID;
}

/// A dump reply frame describing link `index`.
pub fn link_frame(index: i32, name: &str, seq: u32) -> Vec<u8> {
    let mut msg = IfInfoMessage::new(NlMsgType::RTM_NEWLINK, NLM_F_MULTI)
        .with_body(IfInfoMsg::new().with_index(index))
        .with(IflaAttr::Ifname, Attr::Str(name.into()))
        .with(IflaAttr::Mtu, Attr::U32(1500));
    reply_header(msg.header_mut(), seq);
    encode(msg.into())
}

/// An unsolicited address event on link `index`.
pub fn addr_event_frame(index: u32, addr: &str) -> Vec<u8> {
    let ip: std::net::Ipv4Addr = addr.parse().expect("address");
    let msg = IfAddrMessage::new(NlMsgType::RTM_NEWADDR, 0)
        .with_body(
            IfAddrMsg::new()
                .with_family(af::INET)
                .with_prefixlen(24)
                .with_index(index),
        )
        .with(IfaAttr::Address, Attr::Ip4(ip));
    encode(msg.into())
}

pub fn done_frame(seq: u32) -> Vec<u8> {
    let mut msg = DoneMessage::default();
    msg.header_mut().nlmsg_flags = NLM_F_MULTI;
    reply_header(msg.header_mut(), seq);
    encode(msg.into())
}

/// `NLMSG_ERROR` with `error` (negative errno, 0 for an ACK).
pub fn error_frame(error: i32, request_type: u16, seq: u32) -> Vec<u8> {
    let mut request = NlMsgHdr::new(request_type, 0);
    reply_header(&mut request, seq);
    encode(ErrorMessage::new(error, request).into())
}

/// Skip the test when the host cannot open a netlink socket.
#[macro_export]
macro_rules! open_or_skip {
    ($config:expr) => {
        match rtnl::netlink::Transport::open($config) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Skipping test: cannot open netlink socket: {}", e);
                return;
            }
        }
    };
}
