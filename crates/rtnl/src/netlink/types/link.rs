//! Link (network interface) message types.

use std::fmt;

use super::Layout::{self, *};
use super::{Table, af};
use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interface info message (struct ifinfomsg).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct IfInfoMsg {
    /// Address family (usually AF_UNSPEC).
    pub ifi_family: u8,
    /// Padding.
    pub ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    /// Interface index.
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Change mask.
    pub ifi_change: u32,
}

impl IfInfoMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new interface info message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface index.
    pub fn with_index(mut self, index: i32) -> Self {
        self.ifi_index = index;
        self
    }

    /// Set the address family.
    pub fn with_family(mut self, family: u8) -> Self {
        self.ifi_family = family;
        self
    }

    /// Set flags together with their change mask.
    pub fn with_flags(mut self, flags: u32, change: u32) -> Self {
        self.ifi_flags = flags;
        self.ifi_change = change;
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
    /// Interface link attributes (IFLA_*).
    pub enum IflaAttr in Link, slots = 96 {
        Unspec = 0 => Bytes,
        Address = 1 => HwAddr,
        Broadcast = 2 => HwAddr,
        Ifname = 3 => Str,
        Mtu = 4 => U32,
        Link = 5 => U32,
        Qdisc = 6 => Str,
        Stats = 7 => Stats,
        Cost = 8 => Bytes,
        Priority = 9 => Bytes,
        Master = 10 => U32,
        /// Wireless extensions
        Wireless = 11 => Bytes,
        /// Protocol specific information
        Protinfo = 12 => Bytes,
        TxqLen = 13 => U32,
        Map = 14 => Bytes,
        Weight = 15 => U32,
        Operstate = 16 => Layout::OperState,
        Linkmode = 17 => U8,
        Linkinfo = 18 => Nested(Table::LinkInfo),
        NetNsPid = 19 => U32,
        Ifalias = 20 => Str,
        NumVf = 21 => U32,
        VfinfoList = 22 => Bytes,
        Stats64 = 23 => Stats64,
        VfPorts = 24 => Bytes,
        PortSelf = 25 => Bytes,
        AfSpec = 26 => Nested(Table::AfSpec),
        Group = 27 => U32,
        NetNsFd = 28 => U32,
        ExtMask = 29 => U32,
        Promiscuity = 30 => U32,
        NumTxQueues = 31 => U32,
        NumRxQueues = 32 => U32,
        Carrier = 33 => U8,
        PhysPortId = 34 => Bytes,
        CarrierChanges = 35 => U32,
        PhysSwitchId = 36 => Bytes,
        LinkNetnsid = 37 => I32,
        PhysPortName = 38 => Str,
        ProtoDown = 39 => U8,
        GsoMaxSegs = 40 => U32,
        GsoMaxSize = 41 => U32,
        Pad = 42 => Bytes,
        Xdp = 43 => Bytes,
        Event = 44 => U32,
        NewNetnsid = 45 => I32,
        IfNetnsid = 46 => I32,
        CarrierUpCount = 47 => U32,
        CarrierDownCount = 48 => U32,
        NewIfindex = 49 => I32,
        MinMtu = 50 => U32,
        MaxMtu = 51 => U32,
        PropList = 52 => Bytes,
        AltIfname = 53 => Str,
        PermAddress = 54 => HwAddr,
        ProtoDownReason = 55 => Bytes,
        ParentDevName = 56 => Str,
        ParentDevBusName = 57 => Str,
        GroMaxSize = 58 => U32,
        TsoMaxSize = 59 => U32,
        TsoMaxSegs = 60 => U32,
        Allmulti = 61 => U32,
        DevlinkPort = 62 => Bytes,
        GsoIpv4MaxSize = 63 => U32,
        GroIpv4MaxSize = 64 => U32,
        DpllPin = 65 => Bytes,
        MaxPacingOffloadHorizon = 66 => U32,
        NetnsImmutable = 67 => U8,
        Headroom = 68 => U16,
        Tailroom = 69 => U16,
    }
}

attr_kinds! {
    /// Link info nested attributes (IFLA_INFO_*).
    ///
    /// `Data` and `SlaveData` are decoded according to `Kind`/`SlaveKind`
    /// once the whole block has been read.
    pub enum IflaInfo in LinkInfo, slots = 16 {
        Unspec = 0 => Bytes,
        Kind = 1 => Str,
        Data = 2 => Bytes,
        Xstats = 3 => Bytes,
        SlaveKind = 4 => Str,
        SlaveData = 5 => Bytes,
    }
}

attr_kinds! {
    /// VLAN link data (IFLA_VLAN_*).
    pub enum IflaVlan in Vlan, slots = 16 {
        Unspec = 0 => Bytes,
        Id = 1 => U16,
        Flags = 2 => Layout::VlanFlags,
        EgressQos = 3 => Bytes,
        IngressQos = 4 => Bytes,
        /// Ethertype, network byte order.
        Protocol = 5 => Be16,
    }
}

attr_kinds! {
    /// IP-in-IP and ip6tnl link data (IFLA_IPTUN_*).
    ///
    /// `Local`/`Remote` are IPv6 for ip6tnl and IPv4 otherwise.
    pub enum IflaIptun in IpTunnel, slots = 32 {
        Unspec = 0 => Bytes,
        Link = 1 => U32,
        Local = 2 => Address,
        Remote = 3 => Address,
        Ttl = 4 => U8,
        Tos = 5 => U8,
        EncapLimit = 6 => U8,
        Flowinfo = 7 => U32,
        /// u16 for ipip/sit, u32 for ip6tnl.
        Flags = 8 => UintByLen,
        Proto = 9 => U8,
        Pmtudisc = 10 => U8,
        SixRdPrefix = 11 => Ip6,
        SixRdRelayPrefix = 12 => Ip4,
        SixRdPrefixlen = 13 => U16,
        SixRdRelayPrefixlen = 14 => U16,
        EncapType = 15 => U16,
        EncapFlags = 16 => U16,
        EncapSport = 17 => Be16,
        EncapDport = 18 => Be16,
        CollectMetadata = 19 => Flag,
        Fwmark = 20 => U32,
    }
}

attr_kinds! {
    /// GRE link data (IFLA_GRE_*).
    ///
    /// `Local`/`Remote` are IPv6 for ip6gre/ip6gretap and IPv4 otherwise.
    pub enum IflaGre in Gre, slots = 40 {
        Unspec = 0 => Bytes,
        Link = 1 => U32,
        Iflags = 2 => Be16,
        Oflags = 3 => Be16,
        Ikey = 4 => U32,
        Okey = 5 => U32,
        Local = 6 => Address,
        Remote = 7 => Address,
        Ttl = 8 => U8,
        Tos = 9 => U8,
        Pmtudisc = 10 => U8,
        EncapLimit = 11 => U8,
        Flowinfo = 12 => U32,
        Flags = 13 => U32,
        EncapType = 14 => U16,
        EncapFlags = 15 => U16,
        EncapSport = 16 => Be16,
        EncapDport = 17 => Be16,
        CollectMetadata = 18 => Flag,
        IgnoreDf = 19 => U8,
        Fwmark = 20 => U32,
        ErspanIndex = 21 => U32,
        ErspanVer = 22 => U8,
        ErspanDir = 23 => U8,
        ErspanHwid = 24 => U16,
    }
}

attr_kinds! {
    /// IFLA_AF_SPEC entries, keyed by address family.
    pub enum AfSpecFamily in AfSpec, slots = 64 {
        Inet = 2 => Nested(Table::Inet),
        Bridge = 7 => Bytes,
        Inet6 = 10 => Nested(Table::Inet6),
        Mpls = 28 => Bytes,
    }
}

attr_kinds! {
    /// AF_INET link attributes (IFLA_INET_*).
    pub enum IflaInet in Inet, slots = 8 {
        Unspec = 0 => Bytes,
        /// ipv4_devconf values, indexed by IPV4_DEVCONF_* minus one.
        Conf = 1 => DevConf,
    }
}

attr_kinds! {
    /// AF_INET6 link attributes (IFLA_INET6_*).
    pub enum IflaInet6 in Inet6, slots = 16 {
        Unspec = 0 => Bytes,
        Flags = 1 => U32,
        /// ipv6_devconf values, indexed by DEVCONF_*.
        Conf = 2 => DevConf,
        Stats = 3 => Stats64,
        Mcast = 4 => Bytes,
        Cacheinfo = 5 => Bytes,
        Icmp6stats = 6 => Stats64,
        Token = 7 => Ip6,
        AddrGenMode = 8 => U8,
        RaMtu = 9 => U32,
    }
}

/// Interface flags (IFF_*).
pub mod iff {
    pub const UP: u32 = 1 << 0;
    pub const BROADCAST: u32 = 1 << 1;
    pub const DEBUG: u32 = 1 << 2;
    pub const LOOPBACK: u32 = 1 << 3;
    pub const POINTOPOINT: u32 = 1 << 4;
    pub const NOTRAILERS: u32 = 1 << 5;
    pub const RUNNING: u32 = 1 << 6;
    pub const NOARP: u32 = 1 << 7;
    pub const PROMISC: u32 = 1 << 8;
    pub const ALLMULTI: u32 = 1 << 9;
    pub const MASTER: u32 = 1 << 10;
    pub const SLAVE: u32 = 1 << 11;
    pub const MULTICAST: u32 = 1 << 12;
    pub const PORTSEL: u32 = 1 << 13;
    pub const AUTOMEDIA: u32 = 1 << 14;
    pub const DYNAMIC: u32 = 1 << 15;
    pub const LOWER_UP: u32 = 1 << 16;
    pub const DORMANT: u32 = 1 << 17;
    pub const ECHO: u32 = 1 << 18;
}

/// IPv6 per-interface flags carried in IFLA_INET6_FLAGS.
pub mod inet6_flags {
    pub const ONLINK: u32 = 0x01;
    pub const AUTOCONF: u32 = 0x02;
    pub const RS_SENT: u32 = 0x10;
    pub const RCVD: u32 = 0x20;
    pub const MANAGED: u32 = 0x40;
    pub const OTHERCONF: u32 = 0x80;
    pub const READY: u32 = 0x8000_0000;
}

/// VLAN flags (VLAN_FLAG_*).
pub mod vlan_flags {
    pub const REORDER_HDR: u32 = 0x1;
    pub const GVRP: u32 = 0x2;
    pub const LOOSE_BINDING: u32 = 0x4;
    pub const MVRP: u32 = 0x8;
    pub const BRIDGE_BINDING: u32 = 0x10;
}

/// Counter positions inside IFLA_STATS / IFLA_STATS64.
pub mod link_stat {
    pub const RX_PACKETS: usize = 0;
    pub const TX_PACKETS: usize = 1;
    pub const RX_BYTES: usize = 2;
    pub const TX_BYTES: usize = 3;
    pub const RX_ERRORS: usize = 4;
    pub const TX_ERRORS: usize = 5;
    pub const RX_DROPPED: usize = 6;
    pub const TX_DROPPED: usize = 7;
    pub const MULTICAST: usize = 8;
    pub const COLLISIONS: usize = 9;
    pub const RX_NOHANDLER: usize = 23;
}

/// VLAN flags with their mask (struct ifla_vlan_flags).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct VlanFlags {
    pub flags: u32,
    pub mask: u32,
}

/// RFC 2863 operational state (IF_OPER_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperState {
    Unknown = 0,
    NotPresent = 1,
    Down = 2,
    LowerLayerDown = 3,
    Testing = 4,
    Dormant = 5,
    Up = 6,
}

impl TryFrom<u8> for OperState {
    type Error = u8;

    fn try_from(val: u8) -> std::result::Result<Self, u8> {
        Ok(match val {
            0 => Self::Unknown,
            1 => Self::NotPresent,
            2 => Self::Down,
            3 => Self::LowerLayerDown,
            4 => Self::Testing,
            5 => Self::Dormant,
            6 => Self::Up,
            other => return Err(other),
        })
    }
}

impl OperState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotPresent => "notpresent",
            Self::Down => "down",
            Self::LowerLayerDown => "lowerlayerdown",
            Self::Testing => "testing",
            Self::Dormant => "dormant",
            Self::Up => "up",
        }
    }
}

impl fmt::Display for OperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Link kinds whose IFLA_INFO_DATA has a typed decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    Dummy,
    Tun,
    Veth,
    Vlan,
    Ipip,
    Ip6tnl,
    Gre,
    Gretap,
    Ip6gre,
    Ip6gretap,
}

impl InterfaceKind {
    /// Parse the IFLA_INFO_KIND string.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "dummy" => Self::Dummy,
            "tun" => Self::Tun,
            "veth" => Self::Veth,
            "vlan" => Self::Vlan,
            "ipip" => Self::Ipip,
            "ip6tnl" => Self::Ip6tnl,
            "gre" => Self::Gre,
            "gretap" => Self::Gretap,
            "ip6gre" => Self::Ip6gre,
            "ip6gretap" => Self::Ip6gretap,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dummy => "dummy",
            Self::Tun => "tun",
            Self::Veth => "veth",
            Self::Vlan => "vlan",
            Self::Ipip => "ipip",
            Self::Ip6tnl => "ip6tnl",
            Self::Gre => "gre",
            Self::Gretap => "gretap",
            Self::Ip6gre => "ip6gre",
            Self::Ip6gretap => "ip6gretap",
        }
    }

    /// Table and address family used to decode this kind's IFLA_INFO_DATA.
    pub fn data_table(self) -> Option<(Table, u8)> {
        match self {
            Self::Vlan => Some((Table::Vlan, af::UNSPEC)),
            Self::Ipip => Some((Table::IpTunnel, af::INET)),
            Self::Ip6tnl => Some((Table::IpTunnel, af::INET6)),
            Self::Gre | Self::Gretap => Some((Table::Gre, af::INET)),
            Self::Ip6gre | Self::Ip6gretap => Some((Table::Gre, af::INET6)),
            Self::Dummy | Self::Tun | Self::Veth => None,
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifinfomsg_layout() {
        assert_eq!(IfInfoMsg::SIZE, 16);
        let msg = IfInfoMsg::new().with_index(2).with_flags(iff::UP, iff::UP);
        let bytes = msg.as_bytes();
        assert_eq!(&bytes[4..8], &2i32.to_ne_bytes());
        assert_eq!(IfInfoMsg::from_bytes(bytes).unwrap(), msg);
        // Wire bodies need not be aligned in the receive buffer
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(bytes);
        assert_eq!(IfInfoMsg::from_bytes(&shifted[1..]).unwrap(), msg);
        assert!(IfInfoMsg::from_bytes(&bytes[..12]).is_err());
    }

    #[test]
    fn test_interface_kind_tables() {
        let kind = InterfaceKind::from_name("ip6gretap").unwrap();
        assert_eq!(kind.data_table(), Some((Table::Gre, af::INET6)));
        assert_eq!(InterfaceKind::from_name("bridge"), None);
        assert_eq!(InterfaceKind::Veth.data_table(), None);
    }

    #[test]
    fn test_oper_state() {
        assert_eq!(OperState::try_from(6), Ok(OperState::Up));
        assert_eq!(OperState::try_from(9), Err(9));
        assert_eq!(OperState::LowerLayerDown.to_string(), "lowerlayerdown");
    }
}
