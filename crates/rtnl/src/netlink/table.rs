//! Fixed-slot attribute tables.

use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

use super::attr::AttrIter;
use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::types::{AttrKind, Table};
use super::value::{Attr, DecodeCtx};

/// Attributes of one message, indexed by kind.
///
/// The table holds one slot per kind in `K`'s range, so lookups are a
/// plain index and encoding walks kinds in ascending order.
#[derive(Clone, PartialEq)]
pub struct AttrTable<K> {
    slots: Vec<Option<Attr>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: AttrKind> Default for AttrTable<K> {
    fn default() -> Self {
        let mut slots = Vec::new();
        slots.resize_with(K::TABLE.slots(), || None);
        Self {
            slots,
            _kind: PhantomData,
        }
    }
}

impl<K: AttrKind> AttrTable<K> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(&self, kind: K) -> Option<&Attr> {
        self.slots.get(kind.index()).and_then(Option::as_ref)
    }

    pub fn attr_mut(&mut self, kind: K) -> Option<&mut Attr> {
        self.slots.get_mut(kind.index()).and_then(Option::as_mut)
    }

    /// Store `value`, returning what the slot held before.
    pub fn set(&mut self, kind: K, value: Attr) -> Option<Attr> {
        self.slots
            .get_mut(kind.index())
            .and_then(|slot| slot.replace(value))
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, kind: K, value: Attr) -> Self {
        self.set(kind, value);
        self
    }

    pub fn remove(&mut self, kind: K) -> Option<Attr> {
        self.slots.get_mut(kind.index()).and_then(Option::take)
    }

    /// Look up a kind that may have no named variant.
    pub fn get_raw(&self, kind: u16) -> Option<&Attr> {
        self.slots.get(kind as usize).and_then(Option::as_ref)
    }

    /// Present attributes in ascending kind order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Attr)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(kind, slot)| slot.as_ref().map(|a| (kind as u16, a)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Empty every slot. Nested arrays go back to their pool.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub(crate) fn decode(&mut self, data: &[u8], ctx: DecodeCtx<'_>) -> Result<()> {
        decode_slots(K::TABLE, data, ctx, &mut self.slots)
    }

    pub(crate) fn encode(&self, b: &mut MessageBuilder) -> Result<()> {
        encode_slots(&self.slots, b)
    }

    pub(crate) fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (kind, value) in self.iter() {
            writeln!(f)?;
            write!(f, "{:width$}", "", width = indent * 4)?;
            match K::TABLE.kind_name(kind) {
                Some(name) => write!(f, "{}: ", name)?,
                None => write!(f, "{}: ", kind)?,
            }
            value.fmt_indented(f, indent + 1)?;
        }
        Ok(())
    }
}

impl<K: AttrKind> fmt::Debug for AttrTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(kind, value)| {
                let key = K::TABLE
                    .kind_name(kind)
                    .map_or_else(|| kind.to_string(), str::to_owned);
                (key, value)
            }))
            .finish()
    }
}

/// Decode an attribute block into `slots`, which must be sized for
/// `table`.
///
/// The first occurrence of a kind wins.
pub(crate) fn decode_slots(
    table: Table,
    data: &[u8],
    ctx: DecodeCtx<'_>,
    slots: &mut [Option<Attr>],
) -> Result<()> {
    for entry in AttrIter::new(data) {
        let (kind, payload) = entry?;
        let Some(slot) = slots.get_mut(kind as usize) else {
            return Err(Error::UnknownAttributeKind {
                table: table.name(),
                kind,
            });
        };
        if slot.is_some() {
            trace!(table = table.name(), kind, "skipping duplicate attribute");
            continue;
        }
        *slot = Some(Attr::decode(table.layout(kind), payload, ctx)?);
    }
    Ok(())
}

/// Append every present slot in ascending kind order.
pub(crate) fn encode_slots(slots: &[Option<Attr>], b: &mut MessageBuilder) -> Result<()> {
    for (kind, slot) in slots.iter().enumerate() {
        if let Some(value) = slot {
            value.encode(kind as u16, b)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::pool::Pool;
    use crate::netlink::types::af;
    use crate::netlink::types::link::IflaAttr;

    fn attr(kind: u16, payload: &[u8]) -> Vec<u8> {
        let len = 4 + payload.len();
        let mut out = Vec::new();
        out.extend_from_slice(&(len as u16).to_ne_bytes());
        out.extend_from_slice(&kind.to_ne_bytes());
        out.extend_from_slice(payload);
        out.resize(len.next_multiple_of(4), 0);
        out
    }

    #[test]
    fn test_first_occurrence_wins() {
        let pool = Pool::new();
        let mut data = attr(4, &1500u32.to_ne_bytes());
        data.extend(attr(4, &9000u32.to_ne_bytes()));

        let mut table = AttrTable::<IflaAttr>::new();
        table
            .decode(&data, DecodeCtx::new(&pool, af::UNSPEC))
            .unwrap();
        assert_eq!(table.attr(IflaAttr::Mtu), Some(&Attr::U32(1500)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unnamed_kind_in_range_kept_raw() {
        let pool = Pool::new();
        let data = attr(90, &[1, 2, 3, 4]);
        let mut table = AttrTable::<IflaAttr>::new();
        table
            .decode(&data, DecodeCtx::new(&pool, af::UNSPEC))
            .unwrap();
        assert_eq!(table.get_raw(90), Some(&Attr::Bytes(vec![1, 2, 3, 4])));
    }

    #[test]
    fn test_kind_beyond_table_rejected() {
        let pool = Pool::new();
        let data = attr(IflaAttr::SLOTS as u16, &[0; 4]);
        let mut table = AttrTable::<IflaAttr>::new();
        let err = table
            .decode(&data, DecodeCtx::new(&pool, af::UNSPEC))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownAttributeKind { table: "link", kind: 96 }
        ));
    }

    #[test]
    fn test_encode_in_kind_order() {
        let table = AttrTable::<IflaAttr>::new()
            .with(IflaAttr::Mtu, Attr::U32(1500))
            .with(IflaAttr::Ifname, Attr::Str("lo".into()));

        let mut b = MessageBuilder::new(16, 0);
        table.encode(&mut b).unwrap();
        let bytes = b.finish();
        let kinds: Vec<u16> = AttrIter::new(&bytes[16..])
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(kinds, vec![3, 4]);
    }

    #[test]
    fn test_set_remove_clear() {
        let mut table = AttrTable::<IflaAttr>::new();
        assert!(table.is_empty());
        assert_eq!(table.set(IflaAttr::Mtu, Attr::U32(1)), None);
        assert_eq!(table.set(IflaAttr::Mtu, Attr::U32(2)), Some(Attr::U32(1)));
        if let Some(Attr::U32(mtu)) = table.attr_mut(IflaAttr::Mtu) {
            *mtu = 3;
        }
        assert_eq!(table.remove(IflaAttr::Mtu), Some(Attr::U32(3)));
        table.set(IflaAttr::Group, Attr::U32(0));
        table.clear();
        assert!(table.is_empty());
    }
}
