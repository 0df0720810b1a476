//! Tests against the host kernel.
//!
//! Each test opens a real NETLINK_ROUTE socket and is skipped when that is
//! not possible (sandboxed builders, missing netlink support). None of
//! them change host state, so they run without root:
//!
//! ```bash
//! cargo test --test integration -- --nocapture
//! ```

#[macro_use]
#[path = "common/mod.rs"]
mod common;

use common::TIMEOUT;
use rtnl::netlink::messages::GenericMessage;
use rtnl::netlink::{Message, NlMsgType, SocketConfig, af, groups, netns, request};
use tokio::time::timeout;

#[tokio::test]
async fn test_link_dump_includes_loopback() {
    let mut transport = open_or_skip!(SocketConfig::new().groups(&[groups::NOOP]));
    assert_ne!(transport.port_id(), 0);

    let mut links = Vec::new();
    timeout(
        TIMEOUT,
        request::request_dump(&mut transport, NlMsgType::RTM_GETLINK, af::UNSPEC, |msg| {
            if let Message::IfInfo(link) = msg {
                links.push((link.index(), link.name().map(str::to_string)));
            }
            Ok(())
        }),
    )
    .await
    .expect("dump timed out")
    .expect("link dump failed");

    assert!(!links.is_empty());
    assert!(links.iter().any(|(_, name)| name.as_deref() == Some("lo")));
    transport.close().await;
}

#[tokio::test]
async fn test_address_dump_decodes() {
    let mut transport = open_or_skip!(SocketConfig::new().groups(&[groups::NOOP]));

    let mut count = 0;
    timeout(
        TIMEOUT,
        request::request_dump(&mut transport, NlMsgType::RTM_GETADDR, af::UNSPEC, |msg| {
            if let Message::IfAddr(addr) = msg {
                assert!(addr.address().is_some() || addr.local().is_some());
                count += 1;
            }
            Ok(())
        }),
    )
    .await
    .expect("dump timed out")
    .expect("address dump failed");

    // Loopback has 127.0.0.1 or ::1 unless networking is entirely absent
    assert!(count > 0);
    transport.close().await;
}

#[tokio::test]
async fn test_listen_on_link_requests() {
    let mut transport = open_or_skip!(SocketConfig::new().groups(&[groups::NOOP]));

    let mut seen = 0;
    timeout(
        TIMEOUT,
        request::listen(
            &mut transport,
            |_| {
                seen += 1;
                Ok(())
            },
            request::LINK_LISTEN_REQS,
        ),
    )
    .await
    .expect("listen timed out")
    .expect("listen failed");
    assert!(seen > 0);
    transport.close().await;
}

#[tokio::test]
async fn test_kernel_rejects_bad_request() {
    let mut transport = open_or_skip!(SocketConfig::new().groups(&[groups::NOOP]));

    // GETLINK for an index that cannot exist, without the dump flag
    let mut req = rtnl::netlink::messages::IfInfoMessage::new(NlMsgType::RTM_GETLINK, 0)
        .with_body(rtnl::netlink::types::link::IfInfoMsg::new().with_index(i32::MAX));
    req.header_mut().nlmsg_flags = rtnl::netlink::NLM_F_REQUEST;
    transport.send(req.into()).await.expect("send");

    let result = timeout(TIMEOUT, request::rx_until_done(&mut transport, |_| Ok(())))
        .await
        .expect("timed out");
    let err = result.expect_err("kernel accepted a missing index");
    assert!(err.is_not_found());
    transport.close().await;
}

#[tokio::test]
async fn test_getlink_request_replies_arrive_as_messages() {
    let mut transport = open_or_skip!(SocketConfig::new().groups(&[groups::NOOP]));
    request::getlink_request(&transport).await.expect("send");

    let first = timeout(TIMEOUT, transport.receive())
        .await
        .expect("timed out")
        .expect("closed");
    assert_eq!(first.msg_type(), NlMsgType::RTM_NEWLINK);
    drop(first);
    transport.close().await;
}

#[tokio::test]
async fn test_generic_request_round_trip_through_kernel() {
    let mut transport = open_or_skip!(SocketConfig::new().groups(&[groups::NOOP]));
    let req = GenericMessage::new(
        NlMsgType::RTM_GETROUTE,
        rtnl::netlink::NLM_F_REQUEST | rtnl::netlink::NLM_F_DUMP,
        af::INET,
    );
    transport.send(req.into()).await.expect("send");

    let result = timeout(TIMEOUT, request::rx_until_done(&mut transport, |msg| {
        assert!(matches!(msg, Message::Route(_)));
        Ok(())
    }))
    .await
    .expect("timed out");
    assert!(result.is_ok());
    transport.close().await;
}

#[test]
fn test_list_named_namespaces() {
    let names = netns::list_named().expect("list");
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
