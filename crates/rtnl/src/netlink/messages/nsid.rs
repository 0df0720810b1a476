//! Namespace id message.

use crate::netlink::error::Result;
use crate::netlink::types::nsid::{DEFAULT_NSID, NetnsAttr, RtGenMsg};
use crate::netlink::value::{Attr, DecodeCtx};

rtnl_message! {
    /// RTM_NEWNSID / RTM_DELNSID / RTM_GETNSID.
    pub struct NetnsMessage {
        body: RtGenMsg,
        attrs: NetnsAttr,
        family: rtgen_family,
    }
}

impl NetnsMessage {
    /// The assigned id (NETNSA_NSID); `None` when not assigned.
    pub fn id(&self) -> Option<i32> {
        self.attr(NetnsAttr::Nsid)
            .and_then(Attr::as_i32)
            .filter(|&id| id != DEFAULT_NSID)
    }

    fn second_pass(&mut self, _ctx: DecodeCtx<'_>) -> Result<()> {
        Ok(())
    }
}
