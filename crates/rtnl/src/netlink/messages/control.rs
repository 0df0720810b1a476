//! Control messages and generic requests.

use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{NlMsgError, NlMsgHdr, NlMsgType};
use crate::netlink::types::nsid::{DEFAULT_NSID, RtGenMsg};

macro_rules! header_accessors {
    ($name:ident) => {
        impl $name {
            pub fn header(&self) -> &NlMsgHdr {
                &self.header
            }

            pub fn header_mut(&mut self) -> &mut NlMsgHdr {
                &mut self.header
            }

            pub fn nsid(&self) -> i32 {
                self.nsid
            }

            pub fn set_nsid(&mut self, nsid: i32) {
                self.nsid = nsid;
            }
        }
    };
}

/// NLMSG_NOOP.
#[derive(Debug, Clone, PartialEq)]
pub struct NoopMessage {
    header: NlMsgHdr,
    nsid: i32,
}

impl Default for NoopMessage {
    fn default() -> Self {
        Self {
            header: NlMsgHdr::new(NlMsgType::NOOP, 0),
            nsid: DEFAULT_NSID,
        }
    }
}

header_accessors!(NoopMessage);

/// NLMSG_DONE, the end of a dump.
#[derive(Debug, Clone, PartialEq)]
pub struct DoneMessage {
    header: NlMsgHdr,
    nsid: i32,
    error: i32,
}

impl Default for DoneMessage {
    fn default() -> Self {
        Self {
            header: NlMsgHdr::new(NlMsgType::DONE, 0),
            nsid: DEFAULT_NSID,
            error: 0,
        }
    }
}

header_accessors!(DoneMessage);

impl DoneMessage {
    /// Negative errno if the dump was cut short, otherwise 0.
    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn with_error(mut self, error: i32) -> Self {
        self.error = error;
        self
    }

    /// The payload is optional; old kernels send none.
    pub(crate) fn decode_payload(&mut self, data: &[u8]) -> Result<()> {
        self.error = match data.get(..4) {
            Some(raw) => i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]),
            None => 0,
        };
        Ok(())
    }

    pub(crate) fn encode_payload(&self, b: &mut MessageBuilder) -> Result<()> {
        b.append_bytes(&self.error.to_ne_bytes());
        Ok(())
    }
}

/// NLMSG_ERROR: an error report, or an ACK when the error is 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMessage {
    header: NlMsgHdr,
    nsid: i32,
    error: i32,
    request: NlMsgHdr,
}

impl Default for ErrorMessage {
    fn default() -> Self {
        Self {
            header: NlMsgHdr::new(NlMsgType::ERROR, 0),
            nsid: DEFAULT_NSID,
            error: 0,
            request: NlMsgHdr::default(),
        }
    }
}

header_accessors!(ErrorMessage);

impl ErrorMessage {
    /// Report `error` (a negative errno) against `request`.
    pub fn new(error: i32, request: NlMsgHdr) -> Self {
        let mut msg = Self {
            error,
            request,
            ..Self::default()
        };
        msg.header.nlmsg_seq = request.nlmsg_seq;
        msg.header.nlmsg_pid = request.nlmsg_pid;
        msg
    }

    /// Negative errno, or 0 for an ACK.
    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Header of the request this message answers.
    pub fn request(&self) -> &NlMsgHdr {
        &self.request
    }

    /// The error as a crate error; `None` for an ACK.
    pub fn to_error(&self) -> Option<Error> {
        (self.error != 0).then(|| Error::from_errno(self.error))
    }

    pub(crate) fn decode_payload(&mut self, data: &[u8]) -> Result<()> {
        let err = NlMsgError::from_bytes(data)?;
        self.error = err.error;
        self.request = err.msg;
        Ok(())
    }

    pub(crate) fn encode_payload(&self, b: &mut MessageBuilder) -> Result<()> {
        b.append(&NlMsgError {
            error: self.error,
            msg: self.request,
        });
        Ok(())
    }
}

/// A request whose body is only an address family, as sent for dumps.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericMessage {
    header: NlMsgHdr,
    nsid: i32,
    family: u8,
}

impl Default for GenericMessage {
    fn default() -> Self {
        Self {
            header: NlMsgHdr::default(),
            nsid: DEFAULT_NSID,
            family: 0,
        }
    }
}

header_accessors!(GenericMessage);

impl GenericMessage {
    pub fn new(msg_type: u16, flags: u16, family: u8) -> Self {
        Self {
            header: NlMsgHdr::new(msg_type, flags),
            nsid: DEFAULT_NSID,
            family,
        }
    }

    pub fn family(&self) -> u8 {
        self.family
    }

    /// Only the family byte is read; whatever full body the sender used
    /// is ignored.
    pub(crate) fn decode_payload(&mut self, data: &[u8]) -> Result<()> {
        self.family = RtGenMsg::from_bytes(data)?.rtgen_family;
        Ok(())
    }

    pub(crate) fn encode_payload(&self, b: &mut MessageBuilder) -> Result<()> {
        b.append(&RtGenMsg::with_family(self.family));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_copies_request_identity() {
        let mut request = NlMsgHdr::new(NlMsgType::RTM_GETLINK, 0x301);
        request.nlmsg_seq = 42;
        request.nlmsg_pid = 1234;

        let err = ErrorMessage::new(-libc::ENOBUFS, request);
        assert_eq!(err.header().nlmsg_seq, 42);
        assert_eq!(err.request(), &request);
        assert!(!err.is_ack());
        assert_eq!(err.to_error().and_then(|e| e.errno()), Some(libc::ENOBUFS));
        assert!(ErrorMessage::new(0, request).to_error().is_none());
    }

    #[test]
    fn test_done_without_payload() {
        let mut done = DoneMessage::default();
        done.decode_payload(&[]).unwrap();
        assert_eq!(done.error(), 0);
        done.decode_payload(&(-4i32).to_ne_bytes()).unwrap();
        assert_eq!(done.error(), -4);
    }

    #[test]
    fn test_error_payload_too_short() {
        let mut err = ErrorMessage::default();
        assert!(matches!(
            err.decode_payload(&[0; 8]),
            Err(Error::Truncated { expected: 20, .. })
        ));
    }
}
