//! Error types for rtnetlink operations.

use std::io;

/// Result type for rtnetlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding, decoding or exchanging messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A system call on the netlink socket failed.
    #[error("{call}: {source}")]
    Os {
        /// Name of the failing call (e.g. `setsockopt(SO_RCVBUF)`).
        call: &'static str,
        /// The OS error.
        #[source]
        source: io::Error,
    },

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel (positive).
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Buffer was shorter than a declared length.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected length.
        expected: usize,
        /// Actual bytes available.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Attribute kind outside the range of its table.
    #[error("unknown {table} attribute kind {kind}")]
    UnknownAttributeKind {
        /// Name of the attribute table.
        table: &'static str,
        /// The offending kind.
        kind: u16,
    },

    /// Message type outside the supported set.
    #[error("unsupported message type {0}")]
    UnsupportedMessageType(u16),

    /// The kernel granted a smaller socket buffer than requested.
    #[error("{option} truncated to {actual} bytes; run: sysctl -w {sysctl}={requested}")]
    BufferTruncated {
        /// Socket option (`SO_RCVBUF` or `SO_SNDBUF`).
        option: &'static str,
        /// Requested size in bytes.
        requested: usize,
        /// Size reported back by the kernel.
        actual: usize,
        /// The sysctl that caps this buffer.
        sysctl: &'static str,
    },

    /// The outbound queue is full.
    #[error("outbound queue full")]
    QueueFull,

    /// The transport has shut down.
    #[error("transport closed")]
    Closed,

    /// Named network namespace does not exist.
    #[error("namespace not found: {name}")]
    NamespaceNotFound {
        /// The namespace name that was not found.
        name: String,
    },
}

impl Error {
    /// Create a kernel error from a negative errno value, as carried in
    /// `NLMSG_ERROR` and `NLMSG_DONE` payloads.
    pub fn from_errno(errno: i32) -> Self {
        let errno = errno.saturating_abs();
        let message = io::Error::from_raw_os_error(errno).to_string();
        Self::Kernel { errno, message }
    }

    /// Wrap an OS error with the name of the failing call.
    pub fn os(call: &'static str, source: io::Error) -> Self {
        Self::Os { call, source }
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } => matches!(*errno, 2 | 19), // ENOENT=2, ENODEV=19
            Self::NamespaceNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        matches!(self.errno(), Some(1 | 13)) // EPERM=1, EACCES=13
    }

    /// Check if this is a "already exists" error (EEXIST).
    pub fn is_already_exists(&self) -> bool {
        self.errno() == Some(17)
    }

    /// Get the errno value if this is a kernel or OS error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } => Some(*errno),
            Self::Os { source, .. } | Self::Io(source) => source.raw_os_error(),
            _ => None,
        }
    }
}
