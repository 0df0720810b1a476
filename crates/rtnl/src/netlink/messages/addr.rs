//! Address message.

use std::net::IpAddr;

use crate::netlink::error::Result;
use crate::netlink::types::addr::{IfAddrMsg, IfaAttr};
use crate::netlink::value::{Attr, DecodeCtx};

rtnl_message! {
    /// RTM_NEWADDR / RTM_DELADDR.
    pub struct IfAddrMessage {
        body: IfAddrMsg,
        attrs: IfaAttr,
        family: ifa_family,
    }
}

impl IfAddrMessage {
    pub fn index(&self) -> u32 {
        self.body.ifa_index
    }

    pub fn prefix_len(&self) -> u8 {
        self.body.ifa_prefixlen
    }

    /// IFA_ADDRESS. On point-to-point links this is the peer.
    pub fn address(&self) -> Option<IpAddr> {
        self.attr(IfaAttr::Address).and_then(Attr::as_ip)
    }

    /// IFA_LOCAL, falling back to IFA_ADDRESS.
    pub fn local(&self) -> Option<IpAddr> {
        self.attr(IfaAttr::Local)
            .and_then(Attr::as_ip)
            .or_else(|| self.address())
    }

    pub fn label(&self) -> Option<&str> {
        self.attr(IfaAttr::Label).and_then(Attr::as_str)
    }

    /// IFA_FLAGS when present, otherwise the 8-bit header flags.
    pub fn flags(&self) -> u32 {
        self.attr(IfaAttr::Flags)
            .and_then(Attr::as_u32)
            .unwrap_or(self.body.ifa_flags.into())
    }

    fn second_pass(&mut self, _ctx: DecodeCtx<'_>) -> Result<()> {
        Ok(())
    }
}
