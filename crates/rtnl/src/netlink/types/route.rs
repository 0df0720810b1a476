//! Route message types.

use super::Layout::{self, *};
use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Route message (struct rtmsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct RtMsg {
    /// Address family.
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// Type of service.
    pub rtm_tos: u8,
    /// Routing table id (see RTA_TABLE for ids above 255).
    pub rtm_table: u8,
    /// Routing protocol (RTPROT_*).
    pub rtm_protocol: u8,
    /// Route scope (RT_SCOPE_*).
    pub rtm_scope: u8,
    /// Route type (RTN_*).
    pub rtm_type: u8,
    /// Route flags (RTM_F_*).
    pub rtm_flags: u32,
}

impl RtMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new route message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address family.
    pub fn with_family(mut self, family: u8) -> Self {
        self.rtm_family = family;
        self
    }

    /// Set the destination prefix length.
    pub fn with_dst_len(mut self, len: u8) -> Self {
        self.rtm_dst_len = len;
        self
    }

    /// Set the routing table.
    pub fn with_table(mut self, table: u8) -> Self {
        self.rtm_table = table;
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
    /// Route attributes (RTA_*).
    ///
    /// `Encap` is decoded according to `EncapType` once the whole message
    /// has been read.
    pub enum RtaAttr in Route, slots = 48 {
        Unspec = 0 => Bytes,
        Dst = 1 => Address,
        Src = 2 => Address,
        Iif = 3 => U32,
        Oif = 4 => U32,
        Gateway = 5 => Address,
        Priority = 6 => U32,
        Prefsrc = 7 => Address,
        Metrics = 8 => Bytes,
        Multipath = 9 => Bytes,
        Protoinfo = 10 => Bytes,
        Flow = 11 => U32,
        Cacheinfo = 12 => Layout::RtaCacheInfo,
        Session = 13 => Bytes,
        MpAlgo = 14 => Bytes,
        Table = 15 => U32,
        Mark = 16 => U32,
        MfcStats = 17 => Bytes,
        Via = 18 => Bytes,
        Newdst = 19 => Bytes,
        Pref = 20 => U8,
        EncapType = 21 => U16,
        Encap = 22 => Bytes,
        Expires = 23 => UintByLen,
        Pad = 24 => Bytes,
        Uid = 25 => U32,
        TtlPropagate = 26 => U8,
        IpProto = 27 => U8,
        Sport = 28 => Be16,
        Dport = 29 => Be16,
        NhId = 30 => U32,
        Flowlabel = 31 => U32,
    }
}

attr_kinds! {
    /// IPv4 lightweight tunnel encap (LWTUNNEL_IP_*).
    pub enum LwtunnelIp in EncapIp, slots = 16 {
        Unspec = 0 => Bytes,
        Id = 1 => U64,
        Dst = 2 => Ip4,
        Src = 3 => Ip4,
        Ttl = 4 => U8,
        Tos = 5 => U8,
        Flags = 6 => U16,
        Pad = 7 => Bytes,
        Opts = 8 => Bytes,
    }
}

attr_kinds! {
    /// IPv6 lightweight tunnel encap (LWTUNNEL_IP6_*).
    pub enum LwtunnelIp6 in EncapIp6, slots = 16 {
        Unspec = 0 => Bytes,
        Id = 1 => U64,
        Dst = 2 => Ip6,
        Src = 3 => Ip6,
        Hoplimit = 4 => U8,
        Tc = 5 => U8,
        Flags = 6 => U16,
        Pad = 7 => Bytes,
        Opts = 8 => Bytes,
    }
}

/// Route cache information (struct rta_cacheinfo).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct RtaCacheInfo {
    pub rta_clntref: u32,
    pub rta_lastuse: u32,
    pub rta_expires: i32,
    pub rta_error: u32,
    pub rta_used: u32,
    pub rta_id: u32,
    pub rta_ts: u32,
    pub rta_tsage: u32,
}

/// Lightweight tunnel encapsulation types (LWTUNNEL_ENCAP_*).
pub mod encap {
    pub const NONE: u16 = 0;
    pub const MPLS: u16 = 1;
    pub const IP: u16 = 2;
    pub const ILA: u16 = 3;
    pub const IP6: u16 = 4;
    pub const SEG6: u16 = 5;
    pub const BPF: u16 = 6;
    pub const SEG6_LOCAL: u16 = 7;
    pub const RPL: u16 = 8;
    pub const IOAM6: u16 = 9;
    pub const XFRM: u16 = 10;
}

/// Well-known routing tables (RT_TABLE_*).
pub mod rt_table {
    pub const UNSPEC: u8 = 0;
    pub const DEFAULT: u8 = 253;
    pub const MAIN: u8 = 254;
    pub const LOCAL: u8 = 255;
}

/// Route types (RTN_*).
pub mod rtn {
    pub const UNSPEC: u8 = 0;
    pub const UNICAST: u8 = 1;
    pub const LOCAL: u8 = 2;
    pub const BROADCAST: u8 = 3;
    pub const ANYCAST: u8 = 4;
    pub const MULTICAST: u8 = 5;
    pub const BLACKHOLE: u8 = 6;
    pub const UNREACHABLE: u8 = 7;
    pub const PROHIBIT: u8 = 8;
}
