//! Route message.

use std::net::IpAddr;

use crate::netlink::error::Result;
use crate::netlink::types::Table;
use crate::netlink::types::route::{RtMsg, RtaAttr, encap};
use crate::netlink::value::{Attr, AttrArray, DecodeCtx};

rtnl_message! {
    /// RTM_NEWROUTE / RTM_DELROUTE.
    ///
    /// After decode, RTA_ENCAP is a nested array for ip and ip6
    /// lightweight tunnels.
    pub struct RouteMessage {
        body: RtMsg,
        attrs: RtaAttr,
        family: rtm_family,
    }
}

impl RouteMessage {
    pub fn destination(&self) -> Option<IpAddr> {
        self.attr(RtaAttr::Dst).and_then(Attr::as_ip)
    }

    pub fn gateway(&self) -> Option<IpAddr> {
        self.attr(RtaAttr::Gateway).and_then(Attr::as_ip)
    }

    /// Output interface index.
    pub fn oif(&self) -> Option<u32> {
        self.attr(RtaAttr::Oif).and_then(Attr::as_u32)
    }

    /// Routing table: RTA_TABLE, or the 8-bit header field.
    pub fn table_id(&self) -> u32 {
        self.attr(RtaAttr::Table)
            .and_then(Attr::as_u32)
            .unwrap_or(self.body.rtm_table.into())
    }

    pub fn encap(&self) -> Option<&AttrArray> {
        self.attr(RtaAttr::Encap).and_then(Attr::as_nested)
    }

    fn second_pass(&mut self, ctx: DecodeCtx<'_>) -> Result<()> {
        let table = match self.attr(RtaAttr::EncapType).and_then(Attr::as_u16) {
            Some(encap::IP) => Table::EncapIp,
            Some(encap::IP6) => Table::EncapIp6,
            _ => return Ok(()),
        };
        let nested = match self.attr(RtaAttr::Encap) {
            Some(Attr::Bytes(raw)) => AttrArray::decode(table, raw, ctx)?,
            _ => return Ok(()),
        };
        self.attrs.set(RtaAttr::Encap, Attr::Nested(nested));
        Ok(())
    }
}
