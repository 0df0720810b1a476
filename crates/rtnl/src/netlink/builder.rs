//! Message builder for constructing netlink messages.

use super::attr::{NLA_F_NESTED, NlAttr, nla_align};
use super::message::{NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};
use zerocopy::{Immutable, IntoBytes};

/// Token returned when starting a nested attribute.
/// Used to finalize the nested attribute length.
#[derive(Debug, Clone, Copy)]
pub struct NestToken {
    /// Offset of the nested attribute header in the buffer.
    offset: usize,
}

/// Builder for constructing netlink messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    /// Create a new message builder with the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self::with_header(NlMsgHdr::new(msg_type, flags))
    }

    /// Create a builder from an existing header.
    pub fn with_header(header: NlMsgHdr) -> Self {
        Self::with_buffer(Vec::with_capacity(256), header)
    }

    /// Create a builder that writes into `buf`, reusing its allocation.
    pub fn with_buffer(mut buf: Vec<u8>, header: NlMsgHdr) -> Self {
        buf.clear();
        buf.extend_from_slice(header.as_bytes());
        buf.resize(NLMSG_HDRLEN, 0);
        Self { buf }
    }

    /// Get the current message length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the message is empty (header only).
    pub fn is_empty(&self) -> bool {
        self.buf.len() == NLMSG_HDRLEN
    }

    /// Append raw bytes to the message (with alignment padding).
    pub fn append_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        // Pad to alignment
        let aligned = nlmsg_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Append a fixed-layout kernel struct to the message.
    pub fn append<T: IntoBytes + Immutable>(&mut self, data: &T) {
        self.append_bytes(data.as_bytes());
    }

    /// Append an attribute with the given type and data.
    pub fn append_attr(&mut self, attr_type: u16, data: &[u8]) {
        let attr = NlAttr::new(attr_type, data.len());
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(data);
        // Pad to alignment
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Append a u8 attribute.
    pub fn append_attr_u8(&mut self, attr_type: u16, value: u8) {
        self.append_attr(attr_type, &[value]);
    }

    /// Append an empty (flag) attribute with no payload.
    pub fn append_attr_empty(&mut self, attr_type: u16) {
        self.append_attr(attr_type, &[]);
    }

    /// Append a u16 attribute (native endian).
    pub fn append_attr_u16(&mut self, attr_type: u16, value: u16) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a u32 attribute (native endian).
    pub fn append_attr_u32(&mut self, attr_type: u16, value: u32) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a u64 attribute (native endian).
    pub fn append_attr_u64(&mut self, attr_type: u16, value: u64) {
        self.append_attr(attr_type, &value.to_ne_bytes());
    }

    /// Append a u16 attribute (big endian / network order).
    pub fn append_attr_u16_be(&mut self, attr_type: u16, value: u16) {
        self.append_attr(attr_type, &value.to_be_bytes());
    }

    /// Append a null-terminated string attribute.
    pub fn append_attr_str(&mut self, attr_type: u16, value: &str) {
        let attr = NlAttr::new(attr_type, value.len() + 1);
        self.buf.extend_from_slice(attr.as_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0); // null terminator
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Start a nested attribute. Returns a token to finalize it.
    pub fn nest_start(&mut self, attr_type: u16) -> NestToken {
        let offset = self.buf.len();
        // Write placeholder header with nested flag
        let attr = NlAttr::new(attr_type | NLA_F_NESTED, 0);
        self.buf.extend_from_slice(attr.as_bytes());
        NestToken { offset }
    }

    /// End a nested attribute started with `nest_start`.
    pub fn nest_end(&mut self, token: NestToken) {
        let len = self.buf.len() - token.offset;
        // Update the length in the nested attribute header
        let len_bytes = (len as u16).to_ne_bytes();
        self.buf[token.offset..token.offset + 2].copy_from_slice(&len_bytes);
        // Ensure alignment
        let aligned = nla_align(self.buf.len());
        self.buf.resize(aligned, 0);
    }

    /// Finalize and return the message bytes.
    pub fn finish(mut self) -> Vec<u8> {
        // Update message length in header
        let len = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::{AttrIter, NLA_HDRLEN};
    use crate::netlink::message::NLM_F_REQUEST;

    #[test]
    fn test_simple_message() {
        let msg = MessageBuilder::new(16, NLM_F_REQUEST).finish();
        assert_eq!(msg.len(), NLMSG_HDRLEN);

        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_len as usize, NLMSG_HDRLEN);
        assert_eq!(header.nlmsg_type, 16);
        assert_eq!(header.nlmsg_flags, NLM_F_REQUEST);
    }

    #[test]
    fn test_string_attribute_is_padded() {
        let mut builder = MessageBuilder::new(16, NLM_F_REQUEST);
        builder.append_attr_str(3, "eth0");
        let msg = builder.finish();

        // "eth0\0" is 5 bytes, padded to 8
        assert_eq!(msg.len(), NLMSG_HDRLEN + NLA_HDRLEN + 8);
        assert_eq!(msg.len() % 4, 0);
        let attr = NlAttr::from_bytes(&msg[NLMSG_HDRLEN..]).unwrap();
        assert_eq!(attr.nla_len as usize, NLA_HDRLEN + 5);
    }

    #[test]
    fn test_nested_attribute() {
        let mut builder = MessageBuilder::new(16, NLM_F_REQUEST);
        let nest = builder.nest_start(18);
        builder.append_attr_u16(1, 100);
        builder.nest_end(nest);
        let msg = builder.finish();

        let (kind, payload) = AttrIter::new(&msg[NLMSG_HDRLEN..])
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(kind, 18);
        // inner attr is 6 bytes padded to 8
        assert_eq!(payload.len(), 8);
    }

    #[test]
    fn test_reused_buffer_is_cleared() {
        let mut first = MessageBuilder::new(16, 0);
        first.append_attr_u32(4, 1500);
        let buf = first.finish();

        let second = MessageBuilder::with_buffer(buf, NlMsgHdr::new(22, 0)).finish();
        assert_eq!(second.len(), NLMSG_HDRLEN);
        assert_eq!(NlMsgHdr::from_bytes(&second).unwrap().nlmsg_type, 22);
    }
}
