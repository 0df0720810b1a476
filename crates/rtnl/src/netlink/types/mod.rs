//! Fixed-layout message bodies and attribute kind tables.
//!
//! Every attribute table is described by a kind enum generated with
//! `attr_kinds!`. Besides the enum itself the macro records, for each
//! kind, the [`Layout`] its payload decodes with. A table has a fixed
//! number of slots; kinds inside that range but without a named variant
//! are kept as raw bytes, kinds beyond it are rejected.

use std::fmt;

/// Address families (AF_*) used by rtnetlink bodies.
pub mod af {
    pub const UNSPEC: u8 = 0;
    pub const INET: u8 = 2;
    pub const BRIDGE: u8 = 7;
    pub const INET6: u8 = 10;
    pub const PACKET: u8 = 17;
    pub const MPLS: u8 = 28;
}

/// How an attribute payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    U8,
    U16,
    /// u16 in network byte order.
    Be16,
    U32,
    I32,
    U64,
    /// Unsigned integer sized by payload length (1, 2, 4 or 8 bytes).
    UintByLen,
    /// Presence-only attribute with an empty payload.
    Flag,
    Str,
    /// IP address of the enclosing message's address family.
    Address,
    /// Hardware address sized by payload length.
    HwAddr,
    Ip4,
    Ip6,
    Stats,
    Stats64,
    DevConf,
    IfaCacheInfo,
    RtaCacheInfo,
    NdaCacheInfo,
    VlanFlags,
    OperState,
    Nested(Table),
    Bytes,
}

/// Identifies an attribute table: the kinds of one message type or of one
/// nested attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Link,
    Addr,
    Route,
    Neighbor,
    Netns,
    LinkInfo,
    Vlan,
    IpTunnel,
    Gre,
    AfSpec,
    Inet,
    Inet6,
    EncapIp,
    EncapIp6,
}

impl Table {
    /// Short name used in errors and output.
    pub const fn name(self) -> &'static str {
        match self {
            Table::Link => "link",
            Table::Addr => "address",
            Table::Route => "route",
            Table::Neighbor => "neighbor",
            Table::Netns => "netns",
            Table::LinkInfo => "link info",
            Table::Vlan => "vlan",
            Table::IpTunnel => "ip tunnel",
            Table::Gre => "gre",
            Table::AfSpec => "af spec",
            Table::Inet => "inet",
            Table::Inet6 => "inet6",
            Table::EncapIp => "ip encap",
            Table::EncapIp6 => "ip6 encap",
        }
    }

    /// Number of slots in this table.
    pub const fn slots(self) -> usize {
        match self {
            Table::Link => link::IflaAttr::SLOTS,
            Table::Addr => addr::IfaAttr::SLOTS,
            Table::Route => route::RtaAttr::SLOTS,
            Table::Neighbor => neigh::NdaAttr::SLOTS,
            Table::Netns => nsid::NetnsAttr::SLOTS,
            Table::LinkInfo => link::IflaInfo::SLOTS,
            Table::Vlan => link::IflaVlan::SLOTS,
            Table::IpTunnel => link::IflaIptun::SLOTS,
            Table::Gre => link::IflaGre::SLOTS,
            Table::AfSpec => link::AfSpecFamily::SLOTS,
            Table::Inet => link::IflaInet::SLOTS,
            Table::Inet6 => link::IflaInet6::SLOTS,
            Table::EncapIp => route::LwtunnelIp::SLOTS,
            Table::EncapIp6 => route::LwtunnelIp6::SLOTS,
        }
    }

    /// Payload layout of a raw kind in this table.
    pub fn layout(self, kind: u16) -> Layout {
        match self {
            Table::Link => link::IflaAttr::layout(kind),
            Table::Addr => addr::IfaAttr::layout(kind),
            Table::Route => route::RtaAttr::layout(kind),
            Table::Neighbor => neigh::NdaAttr::layout(kind),
            Table::Netns => nsid::NetnsAttr::layout(kind),
            Table::LinkInfo => link::IflaInfo::layout(kind),
            Table::Vlan => link::IflaVlan::layout(kind),
            Table::IpTunnel => link::IflaIptun::layout(kind),
            Table::Gre => link::IflaGre::layout(kind),
            Table::AfSpec => link::AfSpecFamily::layout(kind),
            Table::Inet => link::IflaInet::layout(kind),
            Table::Inet6 => link::IflaInet6::layout(kind),
            Table::EncapIp => route::LwtunnelIp::layout(kind),
            Table::EncapIp6 => route::LwtunnelIp6::layout(kind),
        }
    }

    /// Symbolic name of a raw kind, if it has one.
    pub fn kind_name(self, kind: u16) -> Option<&'static str> {
        fn named<K: AttrKind>(kind: u16) -> Option<&'static str> {
            K::try_from(kind).ok().map(K::name)
        }
        match self {
            Table::Link => named::<link::IflaAttr>(kind),
            Table::Addr => named::<addr::IfaAttr>(kind),
            Table::Route => named::<route::RtaAttr>(kind),
            Table::Neighbor => named::<neigh::NdaAttr>(kind),
            Table::Netns => named::<nsid::NetnsAttr>(kind),
            Table::LinkInfo => named::<link::IflaInfo>(kind),
            Table::Vlan => named::<link::IflaVlan>(kind),
            Table::IpTunnel => named::<link::IflaIptun>(kind),
            Table::Gre => named::<link::IflaGre>(kind),
            Table::AfSpec => named::<link::AfSpecFamily>(kind),
            Table::Inet => named::<link::IflaInet>(kind),
            Table::Inet6 => named::<link::IflaInet6>(kind),
            Table::EncapIp => named::<route::LwtunnelIp>(kind),
            Table::EncapIp6 => named::<route::LwtunnelIp6>(kind),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute kind enum bound to its table.
pub trait AttrKind: Copy + Into<u16> + TryFrom<u16> + fmt::Debug + 'static {
    /// The table this kind indexes.
    const TABLE: Table;

    /// Name of this kind.
    fn name(self) -> &'static str;

    /// Slot index of this kind.
    fn index(self) -> usize {
        let raw: u16 = self.into();
        raw as usize
    }
}

/// Declares an attribute kind enum together with the payload layout of
/// each kind and the number of slots in its table.
macro_rules! attr_kinds {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident in $table:ident, slots = $slots:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal => $layout:expr,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $value, )*
        }

        impl $name {
            /// Number of slots in the table, including the unnamed reserve.
            pub const SLOTS: usize = $slots;

            /// Every named kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            pub(crate) fn layout(kind: u16) -> $crate::netlink::types::Layout {
                match kind {
                    $( $value => $layout, )*
                    _ => $crate::netlink::types::Layout::Bytes,
                }
            }
        }

        impl TryFrom<u16> for $name {
            type Error = u16;

            fn try_from(val: u16) -> std::result::Result<Self, u16> {
                match val {
                    $( $value => Ok(Self::$variant), )*
                    other => Err(other),
                }
            }
        }

        impl From<$name> for u16 {
            fn from(kind: $name) -> u16 {
                kind as u16
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::netlink::types::AttrKind::name(*self))
            }
        }

        impl $crate::netlink::types::AttrKind for $name {
            const TABLE: $crate::netlink::types::Table = $crate::netlink::types::Table::$table;

            fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant), )*
                }
            }
        }

        const _: () = {
            $( assert!(($value as usize) < $slots); )*
        };
    };
}

pub mod addr;
pub mod link;
pub mod neigh;
pub mod nsid;
pub mod route;
