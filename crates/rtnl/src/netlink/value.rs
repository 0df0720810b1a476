//! Decoded attribute values.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use zerocopy::{FromBytes, IntoBytes};

use super::attr::{NLA_HDRLEN, get};
use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::pool::{Pool, Pooled};
use super::table::{decode_slots, encode_slots};
use super::types::addr::IfaCacheInfo;
use super::types::link::{OperState, VlanFlags};
use super::types::neigh::NdaCacheInfo;
use super::types::route::RtaCacheInfo;
use super::types::{AttrKind, Layout, Table, af};

/// A 48-bit Ethernet (MAC) address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EthernetAddr(pub [u8; 6]);

impl fmt::Display for EthernetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// A decoded attribute value.
///
/// Multi-byte integers are host byte order except [`Attr::Be16`].
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    U8(u8),
    U16(u16),
    /// u16 carried in network byte order, held here in host order.
    Be16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Presence-only attribute.
    Flag,
    Ip4(Ipv4Addr),
    Ip6(Ipv6Addr),
    Ethernet(EthernetAddr),
    Bytes(Vec<u8>),
    Str(String),
    IfaCacheInfo(IfaCacheInfo),
    RtaCacheInfo(RtaCacheInfo),
    NdaCacheInfo(NdaCacheInfo),
    /// 32-bit link counters, see `link_stat`.
    Stats(Vec<u32>),
    /// 64-bit link or protocol counters.
    Stats64(Vec<u64>),
    /// Per-device configuration values.
    DevConf(Vec<u32>),
    VlanFlags(VlanFlags),
    OperState(OperState),
    Nested(Pooled<AttrArray>),
}

/// Decode context: the pool nested arrays come from and the address
/// family that `Layout::Address` payloads are read in.
#[derive(Clone, Copy)]
pub(crate) struct DecodeCtx<'a> {
    pub pool: &'a Pool,
    pub family: u8,
}

impl<'a> DecodeCtx<'a> {
    pub fn new(pool: &'a Pool, family: u8) -> Self {
        Self { pool, family }
    }

    pub fn with_family(self, family: u8) -> Self {
        Self { family, ..self }
    }
}

fn hw_addr(data: &[u8]) -> Attr {
    match data.len() {
        4 => Attr::Ip4(Ipv4Addr::from(get::bytes::<4>(data).unwrap_or_default())),
        16 => Attr::Ip6(Ipv6Addr::from(get::bytes::<16>(data).unwrap_or_default())),
        6 => Attr::Ethernet(EthernetAddr(get::bytes::<6>(data).unwrap_or_default())),
        _ => Attr::Bytes(data.to_vec()),
    }
}

fn read<T: FromBytes>(data: &[u8]) -> Result<T> {
    T::read_from_prefix(data)
        .map(|(v, _)| v)
        .map_err(|_| Error::Truncated {
            expected: std::mem::size_of::<T>(),
            actual: data.len(),
        })
}

impl Attr {
    /// Decode one payload according to its layout.
    pub(crate) fn decode(layout: Layout, data: &[u8], ctx: DecodeCtx<'_>) -> Result<Self> {
        Ok(match layout {
            Layout::U8 => Attr::U8(get::u8(data)?),
            Layout::U16 => Attr::U16(get::u16_ne(data)?),
            Layout::Be16 => Attr::Be16(get::u16_be(data)?),
            Layout::U32 => Attr::U32(get::u32_ne(data)?),
            Layout::I32 => Attr::I32(get::i32_ne(data)?),
            Layout::U64 => Attr::U64(get::u64_ne(data)?),
            Layout::UintByLen => match data.len() {
                1 => Attr::U8(get::u8(data)?),
                2 => Attr::U16(get::u16_ne(data)?),
                4 => Attr::U32(get::u32_ne(data)?),
                8 => Attr::U64(get::u64_ne(data)?),
                n => {
                    return Err(Error::InvalidAttribute(format!(
                        "integer attribute of {} bytes",
                        n
                    )));
                }
            },
            Layout::Flag if data.is_empty() => Attr::Flag,
            Layout::Flag => Attr::Bytes(data.to_vec()),
            Layout::Str => match get::string(data) {
                Some(s) => Attr::Str(s.to_owned()),
                None => Attr::Bytes(data.to_vec()),
            },
            Layout::Address => match (ctx.family, data.len()) {
                (af::INET, 4) | (af::INET6, 16) | (af::UNSPEC, _) => hw_addr(data),
                (af::INET, _) | (af::INET6, _) => Attr::Bytes(data.to_vec()),
                _ => hw_addr(data),
            },
            Layout::HwAddr => hw_addr(data),
            Layout::Ip4 => Attr::Ip4(Ipv4Addr::from(get::bytes::<4>(data)?)),
            Layout::Ip6 => Attr::Ip6(Ipv6Addr::from(get::bytes::<16>(data)?)),
            Layout::Stats => Attr::Stats(get::u32_array(data)?),
            Layout::Stats64 => Attr::Stats64(get::u64_array(data)?),
            Layout::DevConf => Attr::DevConf(get::u32_array(data)?),
            Layout::IfaCacheInfo => Attr::IfaCacheInfo(read(data)?),
            Layout::RtaCacheInfo => Attr::RtaCacheInfo(read(data)?),
            Layout::NdaCacheInfo => Attr::NdaCacheInfo(read(data)?),
            Layout::VlanFlags => Attr::VlanFlags(read(data)?),
            Layout::OperState => {
                let raw = get::u8(data)?;
                match OperState::try_from(raw) {
                    Ok(state) => Attr::OperState(state),
                    Err(raw) => Attr::U8(raw),
                }
            }
            Layout::Nested(table) => Attr::Nested(AttrArray::decode(table, data, ctx)?),
            Layout::Bytes => Attr::Bytes(data.to_vec()),
        })
    }

    /// Append this value as attribute `kind`.
    pub(crate) fn encode(&self, kind: u16, b: &mut MessageBuilder) -> Result<()> {
        let payload_len = match self {
            Attr::Bytes(v) => v.len(),
            Attr::Str(s) => s.len() + 1,
            Attr::Stats(v) | Attr::DevConf(v) => v.len() * 4,
            Attr::Stats64(v) => v.len() * 8,
            _ => 0,
        };
        if NLA_HDRLEN + payload_len > u16::MAX as usize {
            return Err(Error::InvalidAttribute(format!(
                "attribute {} payload of {} bytes does not fit",
                kind, payload_len
            )));
        }

        match self {
            Attr::U8(v) => b.append_attr_u8(kind, *v),
            Attr::U16(v) => b.append_attr_u16(kind, *v),
            Attr::Be16(v) => b.append_attr_u16_be(kind, *v),
            Attr::U32(v) => b.append_attr_u32(kind, *v),
            Attr::U64(v) => b.append_attr_u64(kind, *v),
            Attr::I8(v) => b.append_attr(kind, &v.to_ne_bytes()),
            Attr::I16(v) => b.append_attr(kind, &v.to_ne_bytes()),
            Attr::I32(v) => b.append_attr(kind, &v.to_ne_bytes()),
            Attr::I64(v) => b.append_attr(kind, &v.to_ne_bytes()),
            Attr::Flag => b.append_attr_empty(kind),
            Attr::Ip4(a) => b.append_attr(kind, &a.octets()),
            Attr::Ip6(a) => b.append_attr(kind, &a.octets()),
            Attr::Ethernet(e) => b.append_attr(kind, &e.0),
            Attr::Bytes(v) => b.append_attr(kind, v),
            Attr::Str(s) => b.append_attr_str(kind, s),
            Attr::IfaCacheInfo(c) => b.append_attr(kind, c.as_bytes()),
            Attr::RtaCacheInfo(c) => b.append_attr(kind, c.as_bytes()),
            Attr::NdaCacheInfo(c) => b.append_attr(kind, c.as_bytes()),
            Attr::Stats(v) | Attr::DevConf(v) => b.append_attr(kind, v.as_slice().as_bytes()),
            Attr::Stats64(v) => b.append_attr(kind, v.as_slice().as_bytes()),
            Attr::VlanFlags(v) => b.append_attr(kind, v.as_bytes()),
            Attr::OperState(s) => b.append_attr_u8(kind, *s as u8),
            Attr::Nested(array) => {
                let start = b.len();
                let nest = b.nest_start(kind);
                encode_slots(&array.slots, b)?;
                if b.len() - start > u16::MAX as usize {
                    return Err(Error::InvalidAttribute(format!(
                        "nested attribute {} of {} bytes does not fit",
                        kind,
                        b.len() - start
                    )));
                }
                b.nest_end(nest);
            }
        }
        Ok(())
    }

    /// Wrap a nested array that is not backed by a pool.
    pub fn nested(array: AttrArray) -> Self {
        Attr::Nested(Pooled::detached(array))
    }

    pub fn as_u8(&self) -> Option<u8> {
        match *self {
            Attr::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match *self {
            Attr::U8(v) => Some(v.into()),
            Attr::U16(v) | Attr::Be16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Attr::U8(v) => Some(v.into()),
            Attr::U16(v) | Attr::Be16(v) => Some(v.into()),
            Attr::U32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Attr::U64(v) => Some(v),
            _ => self.as_u32().map(u64::from),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Attr::I8(v) => Some(v.into()),
            Attr::I16(v) => Some(v.into()),
            Attr::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attr::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Attr::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// IPv4 or IPv6 address value.
    pub fn as_ip(&self) -> Option<IpAddr> {
        match *self {
            Attr::Ip4(a) => Some(IpAddr::V4(a)),
            Attr::Ip6(a) => Some(IpAddr::V6(a)),
            _ => None,
        }
    }

    pub fn as_ethernet(&self) -> Option<EthernetAddr> {
        match *self {
            Attr::Ethernet(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_oper_state(&self) -> Option<OperState> {
        match *self {
            Attr::OperState(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&AttrArray> {
        match self {
            Attr::Nested(a) => Some(&**a),
            _ => None,
        }
    }

    pub fn as_nested_mut(&mut self) -> Option<&mut AttrArray> {
        match self {
            Attr::Nested(a) => Some(&mut **a),
            _ => None,
        }
    }

    /// Write the value, indenting nested arrays by `indent` levels.
    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Attr::U8(v) => write!(f, "{}", v),
            Attr::U16(v) => write!(f, "{}", v),
            Attr::Be16(v) => write!(f, "{:#06x}", v),
            Attr::U32(v) => write!(f, "{}", v),
            Attr::U64(v) => write!(f, "{}", v),
            Attr::I8(v) => write!(f, "{}", v),
            Attr::I16(v) => write!(f, "{}", v),
            Attr::I32(v) => write!(f, "{}", v),
            Attr::I64(v) => write!(f, "{}", v),
            Attr::Flag => f.write_str("true"),
            Attr::Ip4(a) => write!(f, "{}", a),
            Attr::Ip6(a) => write!(f, "{}", a),
            Attr::Ethernet(e) => write!(f, "{}", e),
            Attr::Bytes(v) => v.iter().try_for_each(|b| write!(f, "{:02x}", b)),
            Attr::Str(s) => f.write_str(s),
            Attr::IfaCacheInfo(c) => write!(
                f,
                "preferred {} valid {} created {} updated {}",
                c.ifa_prefered, c.ifa_valid, c.cstamp, c.tstamp
            ),
            Attr::RtaCacheInfo(c) => write!(
                f,
                "clntref {} lastuse {} expires {} error {} used {}",
                c.rta_clntref, c.rta_lastuse, c.rta_expires, c.rta_error, c.rta_used
            ),
            Attr::NdaCacheInfo(c) => write!(
                f,
                "confirmed {} used {} updated {} refcnt {}",
                c.ndm_confirmed, c.ndm_used, c.ndm_updated, c.ndm_refcnt
            ),
            Attr::Stats(v) | Attr::DevConf(v) => fmt_list(f, v),
            Attr::Stats64(v) => fmt_list(f, v),
            Attr::VlanFlags(v) => write!(f, "flags {:#x} mask {:#x}", v.flags, v.mask),
            Attr::OperState(s) => write!(f, "{}", s),
            Attr::Nested(array) => array.fmt_indented(f, indent),
        }
    }
}

fn fmt_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 1)
    }
}

/// A nested attribute block.
///
/// Which kinds it holds is decided at runtime by its [`Table`]: the
/// content of IFLA_INFO_DATA, for example, depends on the link kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrArray {
    table: Table,
    slots: Vec<Option<Attr>>,
}

impl Default for AttrArray {
    /// An empty LINKINFO array.
    fn default() -> Self {
        Self::new(Table::LinkInfo)
    }
}

impl AttrArray {
    /// Create an empty array for `table`.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            slots: vec![None; table.slots()],
        }
    }

    /// Table this array is keyed by.
    pub fn table(&self) -> Table {
        self.table
    }

    /// Get an attribute by kind; `None` if absent or if `K` belongs to
    /// another table.
    pub fn attr<K: AttrKind>(&self, kind: K) -> Option<&Attr> {
        if K::TABLE != self.table {
            return None;
        }
        self.get_raw(kind.into())
    }

    /// Get an attribute by raw kind.
    pub fn get_raw(&self, kind: u16) -> Option<&Attr> {
        self.slots.get(kind as usize).and_then(Option::as_ref)
    }

    /// Store an attribute, returning the previous value of the slot.
    pub fn set<K: AttrKind>(&mut self, kind: K, value: Attr) -> Result<Option<Attr>> {
        if K::TABLE != self.table {
            return Err(Error::InvalidAttribute(format!(
                "{} kind {:?} in a {} array",
                K::TABLE,
                kind,
                self.table
            )));
        }
        self.put(kind.into(), value)
    }

    /// Builder form of [`set`](Self::set).
    pub fn with<K: AttrKind>(mut self, kind: K, value: Attr) -> Result<Self> {
        self.set(kind, value)?;
        Ok(self)
    }

    /// Present attributes in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Attr)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(kind, slot)| slot.as_ref().map(|a| (kind as u16, a)))
    }

    /// Number of present attributes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn put(&mut self, kind: u16, value: Attr) -> Result<Option<Attr>> {
        match self.slots.get_mut(kind as usize) {
            Some(slot) => Ok(slot.replace(value)),
            None => Err(Error::UnknownAttributeKind {
                table: self.table.name(),
                kind,
            }),
        }
    }

    /// Empty the array and key it by `table`, keeping its allocation.
    pub fn init(&mut self, table: Table) {
        self.table = table;
        self.slots.clear();
        self.slots.resize_with(table.slots(), || None);
    }

    /// Return to the [`Default`] state.
    pub(crate) fn clear(&mut self) {
        self.init(Table::LinkInfo);
    }

    /// Decode a nested payload into a pooled array.
    pub(crate) fn decode(
        table: Table,
        data: &[u8],
        ctx: DecodeCtx<'_>,
    ) -> Result<Pooled<AttrArray>> {
        let mut array = ctx.pool.acquire::<AttrArray>();
        array.init(table);
        decode_slots(table, data, ctx, &mut array.slots)?;
        Ok(array)
    }

    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (kind, value) in self.iter() {
            writeln!(f)?;
            write!(f, "{:width$}", "", width = indent * 4)?;
            match self.table.kind_name(kind) {
                Some(name) => write!(f, "{}: ", name)?,
                None => write!(f, "{}: ", kind)?,
            }
            value.fmt_indented(f, indent + 1)?;
        }
        Ok(())
    }
}
