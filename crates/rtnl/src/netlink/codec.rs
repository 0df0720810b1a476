//! Frame-level decode and encode of [`Message`]s.
//!
//! `decode` takes exactly one netlink frame (use [`MessageIter`] to split
//! a receive buffer) and checks the declared length against the buffer
//! before touching the body. `encode` writes the header, body and
//! attributes and backpatches every length.
//!
//! [`MessageIter`]: super::message::MessageIter

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{NLMSG_HDRLEN, NlMsgHdr};
use super::messages::Message;
use super::pool::Pool;

/// Decode one frame. Pooled variants are drawn from `pool`.
pub fn decode(buf: &[u8], pool: &Pool) -> Result<Message> {
    let header = NlMsgHdr::from_bytes(buf)?;
    let len = header.nlmsg_len as usize;
    if len < NLMSG_HDRLEN {
        return Err(Error::InvalidMessage(format!(
            "declared length {} is shorter than the header",
            len
        )));
    }
    if len > buf.len() {
        return Err(Error::Truncated {
            expected: len,
            actual: buf.len(),
        });
    }

    let mut msg = Message::empty(header.nlmsg_type, pool)
        .ok_or(Error::UnsupportedMessageType(header.nlmsg_type))?;
    *msg.header_mut() = header;

    let payload = &buf[NLMSG_HDRLEN..len];
    match &mut msg {
        Message::Noop(_) => {}
        Message::Done(m) => m.decode_payload(payload)?,
        Message::Error(m) => m.decode_payload(payload)?,
        Message::Generic(m) => m.decode_payload(payload)?,
        Message::IfInfo(m) => m.decode_payload(payload, pool)?,
        Message::IfAddr(m) => m.decode_payload(payload, pool)?,
        Message::Route(m) => m.decode_payload(payload, pool)?,
        Message::Neighbor(m) => m.decode_payload(payload, pool)?,
        Message::Netns(m) => m.decode_payload(payload, pool)?,
    }
    Ok(msg)
}

/// Encode into `buf`, returning the number of bytes written.
///
/// The header's length field is computed; the other header fields are
/// written as they are.
pub fn encode(msg: &Message, buf: &mut [u8]) -> Result<usize> {
    let bytes = encode_to_vec(msg)?;
    let actual = buf.len();
    let out = buf.get_mut(..bytes.len()).ok_or(Error::Truncated {
        expected: bytes.len(),
        actual,
    })?;
    out.copy_from_slice(&bytes);
    Ok(bytes.len())
}

/// Encode into a fresh buffer.
pub fn encode_to_vec(msg: &Message) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(msg, &mut buf)?;
    Ok(buf)
}

/// Encode into `buf`, replacing its contents and keeping its allocation.
pub fn encode_into(msg: &Message, buf: &mut Vec<u8>) -> Result<()> {
    let mut b = MessageBuilder::with_buffer(std::mem::take(buf), *msg.header());
    match msg {
        Message::Noop(_) => {}
        Message::Done(m) => m.encode_payload(&mut b)?,
        Message::Error(m) => m.encode_payload(&mut b)?,
        Message::Generic(m) => m.encode_payload(&mut b)?,
        Message::IfInfo(m) => m.encode_payload(&mut b)?,
        Message::IfAddr(m) => m.encode_payload(&mut b)?,
        Message::Route(m) => m.encode_payload(&mut b)?,
        Message::Neighbor(m) => m.encode_payload(&mut b)?,
        Message::Netns(m) => m.encode_payload(&mut b)?,
    }
    if b.len() > u32::MAX as usize {
        return Err(Error::InvalidMessage(format!(
            "message of {} bytes does not fit",
            b.len()
        )));
    }
    *buf = b.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::message::{MessageIter, NLM_F_DUMP, NLM_F_REQUEST, NlMsgType};
    use crate::netlink::messages::{
        DoneMessage, ErrorMessage, GenericMessage, IfAddrMessage, IfInfoMessage, NeighborMessage,
        NetnsMessage, RouteMessage,
    };
    use crate::netlink::types::addr::{IfAddrMsg, IfaAttr, IfaCacheInfo};
    use crate::netlink::types::link::{
        AfSpecFamily, IfInfoMsg, IflaAttr, IflaInet6, IflaInfo, IflaVlan, OperState, VlanFlags,
        iff,
    };
    use crate::netlink::types::neigh::{NdMsg, NdaAttr, nud};
    use crate::netlink::types::nsid::NetnsAttr;
    use crate::netlink::types::route::{RtMsg, RtaAttr, RtaCacheInfo};
    use crate::netlink::types::{AttrKind, Layout, Table, af};
    use crate::netlink::value::{Attr, AttrArray, EthernetAddr};

    fn eth0() -> Message {
        IfInfoMessage::new(NlMsgType::RTM_NEWLINK, 0)
            .with_body(IfInfoMsg::new().with_index(2).with_flags(iff::UP, 0))
            .with(IflaAttr::Ifname, Attr::Str("eth0".into()))
            .with(IflaAttr::Mtu, Attr::U32(1500))
            .with(IflaAttr::Operstate, Attr::OperState(OperState::Up))
            .into()
    }

    /// Decode and compare, ignoring the length the encoder filled in.
    fn round_trip(mut msg: Message) {
        let pool = Pool::new();
        let bytes = encode_to_vec(&msg).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        msg.header_mut().nlmsg_len = bytes.len() as u32;
        let decoded = decode(&bytes, &pool).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_eth0_link() {
        let pool = Pool::new();
        let bytes = encode_to_vec(&eth0()).unwrap();
        let Message::IfInfo(link) = decode(&bytes, &pool).unwrap() else {
            panic!("expected a link message");
        };
        assert_eq!(link.attr(IflaAttr::Ifname).and_then(Attr::as_str), Some("eth0"));
        assert_eq!(link.attr(IflaAttr::Mtu).and_then(Attr::as_u32), Some(1500));
        assert_eq!(link.oper_state(), Some(OperState::Up));
        assert!(link.is_up());
    }

    #[test]
    fn test_link_round_trip() {
        let mut info = AttrArray::new(Table::LinkInfo);
        info.set(IflaInfo::Kind, Attr::Str("vlan".into())).unwrap();
        let vlan = AttrArray::new(Table::Vlan)
            .with(IflaVlan::Id, Attr::U16(100))
            .unwrap()
            .with(IflaVlan::Protocol, Attr::Be16(0x8100))
            .unwrap()
            .with(IflaVlan::Flags, Attr::VlanFlags(VlanFlags { flags: 1, mask: 1 }))
            .unwrap();
        info.set(IflaInfo::Data, Attr::nested(vlan)).unwrap();

        let inet6 = AttrArray::new(Table::Inet6)
            .with(IflaInet6::Flags, Attr::U32(0x8000_0000))
            .unwrap()
            .with(IflaInet6::Conf, Attr::DevConf(vec![0, 64, 1]))
            .unwrap();
        let af_spec = AttrArray::new(Table::AfSpec)
            .with(AfSpecFamily::Inet6, Attr::nested(inet6))
            .unwrap();

        let msg: Message = IfInfoMessage::new(NlMsgType::RTM_NEWLINK, 0)
            .with_body(IfInfoMsg::new().with_index(9))
            .with(IflaAttr::Ifname, Attr::Str("eth0.100".into()))
            .with(
                IflaAttr::Address,
                Attr::Ethernet(EthernetAddr([0x02, 0, 0, 0, 0, 0x09])),
            )
            .with(IflaAttr::Stats64, Attr::Stats64((0..23).collect()))
            .with(IflaAttr::Linkinfo, Attr::nested(info))
            .with(IflaAttr::AfSpec, Attr::nested(af_spec))
            .into();
        round_trip(msg);
    }

    #[test]
    fn test_other_variants_round_trip() {
        round_trip(
            IfAddrMessage::new(NlMsgType::RTM_NEWADDR, 0)
                .with_body(
                    IfAddrMsg::new()
                        .with_family(af::INET)
                        .with_prefixlen(24)
                        .with_index(2),
                )
                .with(IfaAttr::Address, Attr::Ip4("192.0.2.10".parse().unwrap()))
                .with(IfaAttr::Label, Attr::Str("eth0".into()))
                .with(
                    IfaAttr::Cacheinfo,
                    Attr::IfaCacheInfo(IfaCacheInfo {
                        ifa_prefered: u32::MAX,
                        ifa_valid: u32::MAX,
                        cstamp: 100,
                        tstamp: 200,
                    }),
                )
                .into(),
        );
        round_trip(
            RouteMessage::new(NlMsgType::RTM_NEWROUTE, 0)
                .with_body(RtMsg::new().with_family(af::INET6).with_dst_len(64))
                .with(RtaAttr::Dst, Attr::Ip6("2001:db8::".parse().unwrap()))
                .with(RtaAttr::Oif, Attr::U32(3))
                .with(
                    RtaAttr::Cacheinfo,
                    Attr::RtaCacheInfo(RtaCacheInfo {
                        rta_expires: -1,
                        ..Default::default()
                    }),
                )
                .into(),
        );
        round_trip(
            NeighborMessage::new(NlMsgType::RTM_NEWNEIGH, 0)
                .with_body(
                    NdMsg::new()
                        .with_family(af::INET)
                        .with_ifindex(2)
                        .with_state(nud::REACHABLE),
                )
                .with(NdaAttr::Dst, Attr::Ip4("192.0.2.1".parse().unwrap()))
                .with(
                    NdaAttr::Lladdr,
                    Attr::Ethernet(EthernetAddr([0x52, 0x54, 0, 0x12, 0x34, 0x56])),
                )
                .into(),
        );
        round_trip(
            NetnsMessage::new(NlMsgType::RTM_NEWNSID, 0)
                .with(NetnsAttr::Nsid, Attr::I32(4))
                .with(NetnsAttr::Fd, Attr::U32(7))
                .into(),
        );
        round_trip(Message::dump_request(NlMsgType::RTM_GETROUTE, af::INET6));
        round_trip(DoneMessage::default().with_error(-16).into());
        round_trip(
            ErrorMessage::new(
                -libc::EPERM,
                NlMsgHdr::new(NlMsgType::RTM_NEWLINK, NLM_F_REQUEST),
            )
            .into(),
        );
    }

    /// A representative value for each payload layout.
    fn sample(layout: Layout) -> Attr {
        match layout {
            Layout::U8 => Attr::U8(3),
            // Also an ENCAP_TYPE with no typed table (BPF)
            Layout::U16 => Attr::U16(6),
            Layout::Be16 => Attr::Be16(0x88a8),
            Layout::U32 | Layout::UintByLen => Attr::U32(70_000),
            Layout::I32 => Attr::I32(-7),
            Layout::U64 => Attr::U64(1 << 40),
            Layout::Flag => Attr::Flag,
            Layout::Str => Attr::Str("x0".into()),
            Layout::Address | Layout::Ip4 => Attr::Ip4("198.51.100.7".parse().unwrap()),
            Layout::Ip6 => Attr::Ip6("2001:db8::7".parse().unwrap()),
            Layout::HwAddr => Attr::Ethernet(EthernetAddr([0x02, 1, 2, 3, 4, 5])),
            Layout::Stats => Attr::Stats(vec![1, 2, 3]),
            Layout::Stats64 => Attr::Stats64(vec![4, 5]),
            Layout::DevConf => Attr::DevConf(vec![0, 1]),
            Layout::IfaCacheInfo => Attr::IfaCacheInfo(IfaCacheInfo {
                cstamp: 9,
                ..Default::default()
            }),
            Layout::RtaCacheInfo => Attr::RtaCacheInfo(RtaCacheInfo {
                rta_used: 9,
                ..Default::default()
            }),
            Layout::NdaCacheInfo => Attr::NdaCacheInfo(Default::default()),
            Layout::VlanFlags => Attr::VlanFlags(VlanFlags { flags: 4, mask: 4 }),
            Layout::OperState => Attr::OperState(OperState::Dormant),
            Layout::Nested(table) => Attr::nested(AttrArray::new(table)),
            Layout::Bytes => Attr::Bytes(vec![0xde, 0xad, 0xbe]),
        }
    }

    fn set_every_kind<K: AttrKind>(all: &[K], mut set: impl FnMut(K, Attr)) {
        for &kind in all {
            set(kind, sample(K::TABLE.layout(kind.into())));
        }
    }

    #[test]
    fn test_every_kind_round_trips() {
        let mut link = IfInfoMessage::new(NlMsgType::RTM_NEWLINK, 0)
            .with_body(IfInfoMsg::new().with_index(5));
        set_every_kind(IflaAttr::ALL, |k, v| {
            link.set(k, v);
        });
        round_trip(link.into());

        let mut addr = IfAddrMessage::new(NlMsgType::RTM_NEWADDR, 0)
            .with_body(IfAddrMsg::new().with_family(af::INET).with_index(5));
        set_every_kind(IfaAttr::ALL, |k, v| {
            addr.set(k, v);
        });
        round_trip(addr.into());

        let mut route = RouteMessage::new(NlMsgType::RTM_NEWROUTE, 0)
            .with_body(RtMsg::new().with_family(af::INET));
        set_every_kind(RtaAttr::ALL, |k, v| {
            route.set(k, v);
        });
        round_trip(route.into());

        let mut neigh = NeighborMessage::new(NlMsgType::RTM_NEWNEIGH, 0)
            .with_body(NdMsg::new().with_family(af::INET));
        set_every_kind(NdaAttr::ALL, |k, v| {
            neigh.set(k, v);
        });
        round_trip(neigh.into());

        let mut netns = NetnsMessage::new(NlMsgType::RTM_NEWNSID, 0);
        set_every_kind(NetnsAttr::ALL, |k, v| {
            netns.set(k, v);
        });
        round_trip(netns.into());
    }

    #[test]
    fn test_decode_at_any_alignment() {
        let bytes = encode_to_vec(&eth0()).unwrap();
        let pool = Pool::new();
        let expected = decode(&bytes, &pool).unwrap();
        for shift in 1..4 {
            let mut backing = vec![0u8; shift];
            backing.extend_from_slice(&bytes);
            assert_eq!(decode(&backing[shift..], &pool).unwrap(), expected, "shift {}", shift);
        }
    }

    #[test]
    fn test_every_prefix_is_truncated() {
        let bytes = encode_to_vec(&eth0()).unwrap();
        let pool = Pool::new();
        for n in 0..bytes.len() {
            match decode(&bytes[..n], &pool) {
                Err(Error::Truncated { .. }) => {}
                other => panic!("prefix of {} bytes: {:?}", n, other),
            }
        }
    }

    #[test]
    fn test_mutations_never_panic() {
        let bytes = encode_to_vec(&eth0()).unwrap();
        let pool = Pool::new();
        // Deterministic xorshift so failures reproduce
        let mut state = 0x2545_f491_u32;
        for _ in 0..2000 {
            let mut mutated = bytes.clone();
            for _ in 0..3 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let at = state as usize % mutated.len();
                mutated[at] = (state >> 8) as u8;
            }
            let _ = decode(&mutated, &pool);
        }
    }

    #[test]
    fn test_lengths_are_aligned() {
        let bytes = encode_to_vec(&eth0()).unwrap();
        let declared = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(declared, bytes.len());
        assert_eq!(declared % 4, 0);

        // "eth0\0" is 5 bytes of payload: nla_len 9, padded to 12
        let attrs: Vec<_> = AttrIter::new(&bytes[32..]).map(Result::unwrap).collect();
        assert_eq!(attrs[0], (IflaAttr::Ifname.into(), &b"eth0\0"[..]));
        assert_eq!(u16::from_ne_bytes([bytes[32], bytes[33]]), 9);
        assert_eq!(bytes.len(), 16 + 16 + 12 + 8 + 8);
    }

    #[test]
    fn test_encode_into_short_buffer() {
        let msg = eth0();
        let mut small = [0u8; 20];
        assert!(matches!(
            encode(&msg, &mut small),
            Err(Error::Truncated { actual: 20, .. })
        ));
        let mut big = [0u8; 256];
        let n = encode(&msg, &mut big).unwrap();
        assert_eq!(&big[..n], encode_to_vec(&msg).unwrap().as_slice());
    }

    #[test]
    fn test_unsupported_type() {
        let mut header = NlMsgHdr::new(NlMsgType::OVERRUN, 0);
        header.nlmsg_len = 16;
        let pool = Pool::new();
        assert!(matches!(
            decode(header.as_bytes(), &pool),
            Err(Error::UnsupportedMessageType(4))
        ));
    }

    #[test]
    fn test_unknown_attribute_kind() {
        let msg: Message = IfAddrMessage::new(NlMsgType::RTM_NEWADDR, 0).into();
        let mut bytes = encode_to_vec(&msg).unwrap();
        // One attribute of kind 40, beyond the address table
        bytes.extend_from_slice(&[8, 0, 40, 0, 0, 0, 0, 0]);
        let len = bytes.len() as u32;
        bytes[..4].copy_from_slice(&len.to_ne_bytes());

        let pool = Pool::new();
        assert!(matches!(
            decode(&bytes, &pool),
            Err(Error::UnknownAttributeKind {
                table: "address",
                kind: 40
            })
        ));
    }

    #[test]
    fn test_generic_accepts_full_body() {
        // GETLINK dumps often carry a whole ifinfomsg
        let mut header = NlMsgHdr::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST | NLM_F_DUMP);
        header.nlmsg_len = 32;
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(&[af::PACKET; 1]);
        bytes.resize(32, 0);

        let pool = Pool::new();
        let Message::Generic(m) = decode(&bytes, &pool).unwrap() else {
            panic!("expected a generic message");
        };
        assert_eq!(m.family(), af::PACKET);
        assert_eq!(
            GenericMessage::new(NlMsgType::RTM_GETLINK, 0, af::PACKET).family(),
            af::PACKET
        );
    }

    /// Two RTM_NEWADDR messages as returned by one `ip -4 addr` dump on a
    /// host with only the loopback address, followed by NLMSG_DONE.
    const LO_ADDR_DUMP: &[u8] = &[
        0x4c, 0x00, 0x00, 0x00, 0x14, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0xd2, 0x04, 0x00,
        0x00, 0x02, 0x08, 0x80, 0xfe, 0x01, 0x00, 0x00, 0x00, 0x08, 0x00, 0x01, 0x00, 0x7f, 0x00,
        0x00, 0x01, 0x08, 0x00, 0x02, 0x00, 0x7f, 0x00, 0x00, 0x01, 0x07, 0x00, 0x03, 0x00, 0x6c,
        0x6f, 0x00, 0x00, 0x08, 0x00, 0x08, 0x00, 0x80, 0x00, 0x00, 0x00, 0x14, 0x00, 0x06, 0x00,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x8e, 0x01, 0x00, 0x00, 0x8e, 0x01, 0x00,
        0x00, 0x14, 0x00, 0x00, 0x00, 0x03, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0xd2, 0x04,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_loopback_address_fixture() {
        let pool = Pool::new();
        let frames: Vec<_> = MessageIter::new(LO_ADDR_DUMP)
            .map(|f| decode(f.unwrap(), &pool).unwrap())
            .collect();
        assert_eq!(frames.len(), 2);

        let Message::IfAddr(addr) = &frames[0] else {
            panic!("expected an address message");
        };
        assert_eq!(addr.index(), 1);
        assert_eq!(addr.prefix_len(), 8);
        assert_eq!(addr.local(), Some("127.0.0.1".parse().unwrap()));
        assert_eq!(addr.label(), Some("lo"));
        assert_eq!(addr.flags(), 0x80);
        assert_eq!(addr.header().nlmsg_pid, 1234);

        assert!(matches!(&frames[1], Message::Done(d) if d.error() == 0));
    }
}
