//! Namespace ID netlink message types and constants.
//!
//! Used by RTM_NEWNSID, RTM_DELNSID and RTM_GETNSID, which assign and
//! report the ids a network namespace uses for its peers.

use super::Layout::*;
use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Sentinel for "no namespace id" (NETNSA_NSID_NOT_ASSIGNED).
///
/// Also the effective namespace id of messages received without
/// namespace ancillary data.
pub const DEFAULT_NSID: i32 = -1;

attr_kinds! {
    /// Namespace id attributes (NETNSA_*).
    pub enum NetnsAttr in Netns, slots = 16 {
        Unspec = 0 => Bytes,
        Nsid = 1 => I32,
        Pid = 2 => U32,
        Fd = 3 => U32,
        TargetNsid = 4 => I32,
        CurrentNsid = 5 => I32,
    }
}

/// rtgenmsg structure padded to 4 bytes.
///
/// This is the body of RTM_*NSID messages and of generic dump requests.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct RtGenMsg {
    /// Address family (usually AF_UNSPEC = 0)
    pub rtgen_family: u8,
    /// Padding.
    pub rtgen_pad: [u8; 3],
}

impl RtGenMsg {
    /// Size of the family byte actually required on the wire.
    pub const MIN_SIZE: usize = 1;

    /// Create with a specific address family.
    pub fn with_family(family: u8) -> Self {
        Self {
            rtgen_family: family,
            rtgen_pad: [0; 3],
        }
    }

    /// Parse from bytes.
    ///
    /// Only the family byte is required; the padding may be absent.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match data.first() {
            Some(&family) => Ok(Self::with_family(family)),
            None => Err(Error::Truncated {
                expected: Self::MIN_SIZE,
                actual: 0,
            }),
        }
    }
}
