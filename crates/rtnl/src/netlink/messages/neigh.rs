//! Neighbor message.

use std::net::IpAddr;

use crate::netlink::error::Result;
use crate::netlink::types::neigh::{NdMsg, NdaAttr};
use crate::netlink::value::{Attr, DecodeCtx, EthernetAddr};

rtnl_message! {
    /// RTM_NEWNEIGH / RTM_DELNEIGH.
    pub struct NeighborMessage {
        body: NdMsg,
        attrs: NdaAttr,
        family: ndm_family,
    }
}

impl NeighborMessage {
    pub fn index(&self) -> u32 {
        self.body.ndm_ifindex as u32
    }

    /// NUD_* state bits.
    pub fn state(&self) -> u16 {
        self.body.ndm_state
    }

    pub fn destination(&self) -> Option<IpAddr> {
        self.attr(NdaAttr::Dst).and_then(Attr::as_ip)
    }

    pub fn lladdr(&self) -> Option<EthernetAddr> {
        self.attr(NdaAttr::Lladdr).and_then(Attr::as_ethernet)
    }

    fn second_pass(&mut self, _ctx: DecodeCtx<'_>) -> Result<()> {
        Ok(())
    }
}
