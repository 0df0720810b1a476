//! Kernel netlink socket and the `Wire` seam the transport runs over.

use std::future::Future;
use std::io;
use std::mem::size_of;
use std::os::unix::io::{AsRawFd, RawFd};

use netlink_sys::{Socket, SocketAddr, protocols};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tracing::{debug, warn};

use super::config::{SocketConfig, group_mask};
use super::error::{Error, Result};

/// Socket option level for netlink options.
pub const SOL_NETLINK: libc::c_int = 270;
/// Deliver events from every peer namespace, tagged with its id.
pub const NETLINK_LISTEN_ALL_NSID: libc::c_int = 8;

/// One received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram {
    /// Bytes written into the data buffer.
    pub len: usize,
    /// Namespace id from the control data, if any.
    pub nsid: Option<i32>,
}

/// A datagram channel to the kernel.
///
/// The transport's receive and transmit tasks only talk to this trait, so
/// anything that can exchange netlink datagrams can stand in for the
/// kernel.
pub trait Wire: Send + Sync + 'static {
    /// Port id the kernel addresses replies to.
    fn port_id(&self) -> u32;

    /// Receive one datagram into `buf`, with control data into `oob`.
    fn recv(
        &self,
        buf: &mut [u8],
        oob: &mut [u8],
    ) -> impl Future<Output = io::Result<Datagram>> + Send;

    /// Send one datagram.
    fn send(&self, buf: &[u8]) -> impl Future<Output = io::Result<()>> + Send;
}

struct BufferOption {
    option: libc::c_int,
    name: &'static str,
    set_call: &'static str,
    get_call: &'static str,
    sysctl: &'static str,
}

const RCVBUF: BufferOption = BufferOption {
    option: libc::SO_RCVBUF,
    name: "SO_RCVBUF",
    set_call: "setsockopt(SO_RCVBUF)",
    get_call: "getsockopt(SO_RCVBUF)",
    sysctl: "net.core.rmem_max",
};

const SNDBUF: BufferOption = BufferOption {
    option: libc::SO_SNDBUF,
    name: "SO_SNDBUF",
    set_call: "setsockopt(SO_SNDBUF)",
    get_call: "getsockopt(SO_SNDBUF)",
    sysctl: "net.core.wmem_max",
};

/// Async NETLINK_ROUTE socket.
pub struct NetlinkSocket {
    fd: AsyncFd<Socket>,
    port_id: u32,
}

impl NetlinkSocket {
    /// Create, size and bind a socket as `config` describes.
    pub fn open(config: &SocketConfig) -> Result<Self> {
        let mut socket =
            Socket::new(protocols::NETLINK_ROUTE).map_err(|e| Error::os("socket", e))?;
        socket
            .set_non_blocking(true)
            .map_err(|e| Error::os("fcntl(O_NONBLOCK)", e))?;

        let raw = socket.as_raw_fd();
        if config.rx_bytes > 0 {
            set_buffer(raw, &RCVBUF, config.rx_bytes)?;
        }
        if config.tx_bytes > 0 {
            set_buffer(raw, &SNDBUF, config.tx_bytes)?;
        }

        let (mask, extra) = group_mask(config.effective_groups());
        let mut addr = SocketAddr::new(0, mask);
        socket.bind(&addr).map_err(|e| Error::os("bind", e))?;
        for group in extra {
            socket
                .add_membership(group)
                .map_err(|e| Error::os("setsockopt(NETLINK_ADD_MEMBERSHIP)", e))?;
        }

        if config.listen_all_nsid {
            setsockopt_int(raw, SOL_NETLINK, NETLINK_LISTEN_ALL_NSID, 1)
                .map_err(|e| Error::os("setsockopt(NETLINK_LISTEN_ALL_NSID)", e))?;
        }

        socket
            .get_address(&mut addr)
            .map_err(|e| Error::os("getsockname", e))?;
        let port_id = addr.port_number();
        debug!(port_id, groups = mask, "netlink socket bound");

        let fd = AsyncFd::new(socket).map_err(|e| Error::os("epoll_ctl", e))?;
        Ok(Self { fd, port_id })
    }
}

impl Wire for NetlinkSocket {
    fn port_id(&self) -> u32 {
        self.port_id
    }

    async fn recv(&self, buf: &mut [u8], oob: &mut [u8]) -> io::Result<Datagram> {
        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            match guard.try_io(|inner| recvmsg(inner.as_raw_fd(), buf, oob)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&self, buf: &[u8]) -> io::Result<()> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(buf, 0)) {
                Ok(result) => {
                    let sent = result?;
                    if sent != buf.len() {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            format!("short send: {} of {} bytes", sent, buf.len()),
                        ));
                    }
                    return Ok(());
                }
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}

fn set_buffer(fd: RawFd, opt: &BufferOption, requested: usize) -> Result<()> {
    let value = libc::c_int::try_from(requested).unwrap_or(libc::c_int::MAX);
    setsockopt_int(fd, libc::SOL_SOCKET, opt.option, value)
        .map_err(|e| Error::os(opt.set_call, e))?;
    let actual = getsockopt_int(fd, libc::SOL_SOCKET, opt.option)
        .map_err(|e| Error::os(opt.get_call, e))?;
    let actual = usize::try_from(actual).unwrap_or(0);
    if actual < requested {
        return Err(Error::BufferTruncated {
            option: opt.name,
            requested,
            actual,
            sysctl: opt.sysctl,
        });
    }
    Ok(())
}

fn setsockopt_int(
    fd: RawFd,
    level: libc::c_int,
    name: libc::c_int,
    value: libc::c_int,
) -> io::Result<()> {
    // SAFETY: `value` outlives the call and the length is its size.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            (&value as *const libc::c_int).cast(),
            size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn getsockopt_int(fd: RawFd, level: libc::c_int, name: libc::c_int) -> io::Result<libc::c_int> {
    let mut value: libc::c_int = 0;
    let mut len = size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: `value` and `len` are valid for writes of their own size.
    let ret = unsafe {
        libc::getsockopt(
            fd,
            level,
            name,
            (&mut value as *mut libc::c_int).cast(),
            &mut len,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(value)
}

/// Non-blocking `recvmsg` that also reads the namespace id control
/// message.
fn recvmsg(fd: RawFd, buf: &mut [u8], oob: &mut [u8]) -> io::Result<Datagram> {
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr().cast(),
        iov_len: buf.len(),
    };
    // SAFETY: an all-zero msghdr is a valid empty header.
    let mut hdr: libc::msghdr = unsafe { std::mem::zeroed() };
    hdr.msg_iov = &mut iov;
    hdr.msg_iovlen = 1 as _;
    hdr.msg_control = oob.as_mut_ptr().cast();
    hdr.msg_controllen = oob.len() as _;

    // SAFETY: `hdr` points at `iov`, `buf` and `oob`, all live and
    // writable for the lengths given.
    let n = unsafe { libc::recvmsg(fd, &mut hdr, libc::MSG_DONTWAIT) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    if hdr.msg_flags & libc::MSG_TRUNC != 0 {
        warn!(len = n, "netlink datagram truncated");
    }

    let mut nsid = None;
    // SAFETY: the CMSG macros walk the control buffer the kernel filled,
    // bounded by `msg_controllen`.
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(&hdr);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == SOL_NETLINK
                && (*cmsg).cmsg_type == NETLINK_LISTEN_ALL_NSID
                && (*cmsg).cmsg_len as usize >= libc::CMSG_LEN(size_of::<i32>() as u32) as usize
            {
                nsid = Some(std::ptr::read_unaligned(
                    libc::CMSG_DATA(cmsg).cast::<i32>(),
                ));
            }
            cmsg = libc::CMSG_NXTHDR(&hdr, cmsg);
        }
    }

    Ok(Datagram {
        len: n as usize,
        nsid,
    })
}
