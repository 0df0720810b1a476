//! Link message.

use crate::netlink::error::Result;
use crate::netlink::types::link::{
    IfInfoMsg, IflaAttr, IflaInfo, InterfaceKind, OperState, iff,
};
use crate::netlink::value::{Attr, AttrArray, DecodeCtx, EthernetAddr};

rtnl_message! {
    /// RTM_NEWLINK / RTM_DELLINK / RTM_SETLINK.
    ///
    /// After decode, IFLA_INFO_DATA inside IFLA_LINKINFO is a nested array
    /// when the link kind has a typed layout (vlan, ip tunnels, gre).
    pub struct IfInfoMessage {
        body: IfInfoMsg,
        attrs: IflaAttr,
        family: ifi_family,
    }
}

impl IfInfoMessage {
    /// Interface index.
    pub fn index(&self) -> u32 {
        self.body.ifi_index as u32
    }

    /// Interface name (IFLA_IFNAME).
    pub fn name(&self) -> Option<&str> {
        self.attr(IflaAttr::Ifname).and_then(Attr::as_str)
    }

    pub fn mtu(&self) -> Option<u32> {
        self.attr(IflaAttr::Mtu).and_then(Attr::as_u32)
    }

    /// Master device index (IFLA_MASTER).
    pub fn master(&self) -> Option<u32> {
        self.attr(IflaAttr::Master).and_then(Attr::as_u32)
    }

    /// Hardware address when it is Ethernet-sized.
    pub fn mac_address(&self) -> Option<EthernetAddr> {
        self.attr(IflaAttr::Address).and_then(Attr::as_ethernet)
    }

    pub fn oper_state(&self) -> Option<OperState> {
        self.attr(IflaAttr::Operstate).and_then(Attr::as_oper_state)
    }

    /// Namespace id of the peer for links spanning namespaces.
    pub fn link_netnsid(&self) -> Option<i32> {
        self.attr(IflaAttr::LinkNetnsid).and_then(Attr::as_i32)
    }

    /// Administratively up (IFF_UP).
    pub fn is_up(&self) -> bool {
        self.body.ifi_flags & iff::UP != 0
    }

    /// Nested IFLA_LINKINFO block.
    pub fn link_info(&self) -> Option<&AttrArray> {
        self.attr(IflaAttr::Linkinfo).and_then(Attr::as_nested)
    }

    /// IFLA_INFO_KIND, e.g. "vlan" or "veth".
    pub fn kind(&self) -> Option<&str> {
        self.link_info()?.attr(IflaInfo::Kind)?.as_str()
    }

    /// Typed IFLA_INFO_DATA, if the kind has a known layout.
    pub fn info_data(&self) -> Option<&AttrArray> {
        self.link_info()?.attr(IflaInfo::Data)?.as_nested()
    }

    /// Re-decode IFLA_INFO_DATA with the table its kind selects.
    fn second_pass(&mut self, ctx: DecodeCtx<'_>) -> Result<()> {
        let Some(info) = self
            .attrs
            .attr_mut(IflaAttr::Linkinfo)
            .and_then(Attr::as_nested_mut)
        else {
            return Ok(());
        };
        let Some((table, family)) = info
            .attr(IflaInfo::Kind)
            .and_then(Attr::as_str)
            .and_then(InterfaceKind::from_name)
            .and_then(InterfaceKind::data_table)
        else {
            return Ok(());
        };
        let data = match info.attr(IflaInfo::Data) {
            Some(Attr::Bytes(raw)) => AttrArray::decode(table, raw, ctx.with_family(family))?,
            _ => return Ok(()),
        };
        info.put(IflaInfo::Data.into(), Attr::Nested(data))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::builder::MessageBuilder;
    use crate::netlink::message::NlMsgType;
    use crate::netlink::pool::Pool;
    use crate::netlink::types::Table;
    use crate::netlink::types::link::{IflaGre, IflaVlan};

    fn link_with_info(info: AttrArray) -> Vec<u8> {
        let msg = IfInfoMessage::new(NlMsgType::RTM_NEWLINK, 0)
            .with_body(IfInfoMsg::new().with_index(7))
            .with(IflaAttr::Ifname, Attr::Str("tun0".into()))
            .with(IflaAttr::Linkinfo, Attr::nested(info));
        let mut b = MessageBuilder::with_header(*msg.header());
        msg.encode_payload(&mut b).unwrap();
        b.finish()
    }

    #[test]
    fn test_vlan_data_second_pass() {
        let mut data = AttrArray::new(Table::LinkInfo);
        data.set(IflaInfo::Kind, Attr::Str("vlan".into())).unwrap();
        // Raw IFLA_VLAN_ID = 100
        data.set(IflaInfo::Data, Attr::Bytes(vec![6, 0, 1, 0, 100, 0, 0, 0]))
            .unwrap();
        let bytes = link_with_info(data);

        let pool = Pool::new();
        let mut link = IfInfoMessage::default();
        link.decode_payload(&bytes[16..], &pool).unwrap();
        assert_eq!(link.kind(), Some("vlan"));
        let vlan = link.info_data().unwrap();
        assert_eq!(vlan.table(), Table::Vlan);
        assert_eq!(vlan.attr(IflaVlan::Id), Some(&Attr::U16(100)));
    }

    #[test]
    fn test_gre_addresses_use_kind_family() {
        let mut data = AttrArray::new(Table::LinkInfo);
        data.set(IflaInfo::Kind, Attr::Str("gre".into())).unwrap();
        // IFLA_GRE_LOCAL = 10.0.0.1
        data.set(IflaInfo::Data, Attr::Bytes(vec![8, 0, 6, 0, 10, 0, 0, 1]))
            .unwrap();
        let bytes = link_with_info(data);

        let pool = Pool::new();
        let mut link = IfInfoMessage::default();
        link.decode_payload(&bytes[16..], &pool).unwrap();
        let gre = link.info_data().unwrap();
        assert_eq!(
            gre.attr(IflaGre::Local).and_then(Attr::as_ip),
            Some("10.0.0.1".parse().unwrap())
        );
    }

    #[test]
    fn test_unknown_kind_keeps_data_raw() {
        let mut data = AttrArray::new(Table::LinkInfo);
        data.set(IflaInfo::Kind, Attr::Str("bridge".into())).unwrap();
        data.set(IflaInfo::Data, Attr::Bytes(vec![5, 0, 1, 0, 1, 0, 0, 0]))
            .unwrap();
        let bytes = link_with_info(data);

        let pool = Pool::new();
        let mut link = IfInfoMessage::default();
        link.decode_payload(&bytes[16..], &pool).unwrap();
        assert!(link.info_data().is_none());
        assert!(
            link.link_info()
                .and_then(|i| i.attr(IflaInfo::Data))
                .and_then(Attr::as_bytes)
                .is_some()
        );
        assert_eq!(link.index(), 7);
        assert_eq!(link.name(), Some("tun0"));
    }
}
