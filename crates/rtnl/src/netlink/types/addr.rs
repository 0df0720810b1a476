//! Address message types.

use super::Layout::{self, *};
use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interface address message (struct ifaddrmsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IfAddrMsg {
    /// Address family.
    pub ifa_family: u8,
    /// Prefix length.
    pub ifa_prefixlen: u8,
    /// Address flags (IFA_F_*), low 8 bits only.
    pub ifa_flags: u8,
    /// Address scope.
    pub ifa_scope: u8,
    /// Interface index.
    pub ifa_index: u32,
}

impl IfAddrMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new address message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address family.
    pub fn with_family(mut self, family: u8) -> Self {
        self.ifa_family = family;
        self
    }

    /// Set the prefix length.
    pub fn with_prefixlen(mut self, prefixlen: u8) -> Self {
        self.ifa_prefixlen = prefixlen;
        self
    }

    /// Set the interface index.
    pub fn with_index(mut self, index: u32) -> Self {
        self.ifa_index = index;
        self
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            })
    }
}

attr_kinds! {
    /// Address attributes (IFA_*).
    pub enum IfaAttr in Addr, slots = 32 {
        Unspec = 0 => Bytes,
        Address = 1 => Address,
        Local = 2 => Address,
        Label = 3 => Str,
        Broadcast = 4 => Address,
        Anycast = 5 => Address,
        Cacheinfo = 6 => Layout::IfaCacheInfo,
        Multicast = 7 => Address,
        /// Full 32-bit flags; supersedes `ifa_flags`.
        Flags = 8 => U32,
        RtPriority = 9 => U32,
        TargetNetnsid = 10 => I32,
        Proto = 11 => U8,
    }
}

/// Address lifetimes (struct ifa_cacheinfo).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IfaCacheInfo {
    /// Preferred lifetime in seconds.
    pub ifa_prefered: u32,
    /// Valid lifetime in seconds.
    pub ifa_valid: u32,
    /// Creation timestamp (hundredths of a second).
    pub cstamp: u32,
    /// Update timestamp (hundredths of a second).
    pub tstamp: u32,
}

/// Address flags (IFA_F_*).
pub mod ifa_flags {
    pub const SECONDARY: u32 = 0x01;
    pub const TEMPORARY: u32 = SECONDARY;
    pub const NODAD: u32 = 0x02;
    pub const OPTIMISTIC: u32 = 0x04;
    pub const DADFAILED: u32 = 0x08;
    pub const HOMEADDRESS: u32 = 0x10;
    pub const DEPRECATED: u32 = 0x20;
    pub const TENTATIVE: u32 = 0x40;
    pub const PERMANENT: u32 = 0x80;
    pub const MANAGETEMPADDR: u32 = 0x100;
    pub const NOPREFIXROUTE: u32 = 0x200;
    pub const MCAUTOJOIN: u32 = 0x400;
    pub const STABLE_PRIVACY: u32 = 0x800;
}

/// Address scope (RT_SCOPE_*).
pub mod scope {
    pub const UNIVERSE: u8 = 0;
    pub const SITE: u8 = 200;
    pub const LINK: u8 = 253;
    pub const HOST: u8 = 254;
    pub const NOWHERE: u8 = 255;
}
