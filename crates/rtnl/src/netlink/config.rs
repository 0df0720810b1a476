//! Socket and queue configuration.

/// rtnetlink multicast groups (RTNLGRP_*).
pub mod groups {
    /// Placeholder group; never bound.
    pub const NOOP: u32 = 0;
    pub const LINK: u32 = 1;
    pub const NOTIFY: u32 = 2;
    pub const NEIGH: u32 = 3;
    pub const TC: u32 = 4;
    pub const IPV4_IFADDR: u32 = 5;
    pub const IPV4_MROUTE: u32 = 6;
    pub const IPV4_ROUTE: u32 = 7;
    pub const IPV4_RULE: u32 = 8;
    pub const IPV6_IFADDR: u32 = 9;
    pub const IPV6_MROUTE: u32 = 10;
    pub const IPV6_ROUTE: u32 = 11;
    pub const IPV6_IFINFO: u32 = 12;
    pub const IPV6_PREFIX: u32 = 18;
    pub const IPV6_RULE: u32 = 19;
    pub const NSID: u32 = 28;
}

/// Groups bound when a config names none.
pub const DEFAULT_GROUPS: &[u32] = &[
    groups::LINK,
    groups::NEIGH,
    groups::IPV4_IFADDR,
    groups::IPV4_MROUTE,
    groups::IPV4_ROUTE,
    groups::IPV6_IFADDR,
    groups::IPV6_MROUTE,
    groups::IPV6_ROUTE,
    groups::NSID,
];

pub const LINK_GROUPS: &[u32] = &[groups::LINK];
pub const ADDR_GROUPS: &[u32] = &[groups::IPV4_IFADDR, groups::IPV6_IFADDR];
pub const ROUTE_GROUPS: &[u32] = &[
    groups::IPV4_MROUTE,
    groups::IPV4_ROUTE,
    groups::IPV6_MROUTE,
    groups::IPV6_ROUTE,
];
pub const NEIGHBOR_GROUPS: &[u32] = &[groups::NEIGH];
pub const NSID_GROUPS: &[u32] = &[groups::NSID];

/// Queue capacity used when a config leaves it at zero.
pub const DEFAULT_MESSAGES: usize = 1024;

/// Bind bitmask for `groups`. Groups above 32 cannot be expressed in the
/// bitmask and are returned separately for `NETLINK_ADD_MEMBERSHIP`.
pub fn group_mask(groups: &[u32]) -> (u32, Vec<u32>) {
    let mut mask = 0u32;
    let mut extra = Vec::new();
    for &group in groups {
        match group {
            groups::NOOP => {}
            1..=32 => mask |= 1 << (group - 1),
            _ => extra.push(group),
        }
    }
    (mask, extra)
}

/// Options for opening a [`Transport`](super::transport::Transport).
///
/// Zero or empty fields mean "kernel or crate default".
///
/// ```ignore
/// let config = SocketConfig::new()
///     .groups(LINK_GROUPS)
///     .rx_bytes(8 << 20)
///     .listen_all_nsid(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    pub(crate) rx_bytes: usize,
    pub(crate) tx_bytes: usize,
    pub(crate) rx_messages: usize,
    pub(crate) tx_messages: usize,
    pub(crate) listen_all_nsid: bool,
    pub(crate) groups: Vec<u32>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            rx_bytes: 0,
            tx_bytes: 0,
            rx_messages: 0,
            tx_messages: 0,
            listen_all_nsid: true,
            groups: Vec::new(),
        }
    }
}

impl SocketConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested SO_RCVBUF in bytes.
    pub fn rx_bytes(mut self, bytes: usize) -> Self {
        self.rx_bytes = bytes;
        self
    }

    /// Requested SO_SNDBUF in bytes.
    pub fn tx_bytes(mut self, bytes: usize) -> Self {
        self.tx_bytes = bytes;
        self
    }

    /// Inbound queue capacity in messages.
    pub fn rx_messages(mut self, messages: usize) -> Self {
        self.rx_messages = messages;
        self
    }

    /// Outbound queue capacity in messages.
    pub fn tx_messages(mut self, messages: usize) -> Self {
        self.tx_messages = messages;
        self
    }

    /// Receive events from every namespace that has an id in ours, each
    /// tagged with that id.
    pub fn listen_all_nsid(mut self, on: bool) -> Self {
        self.listen_all_nsid = on;
        self
    }

    pub fn groups(mut self, groups: &[u32]) -> Self {
        self.groups = groups.to_vec();
        self
    }

    pub(crate) fn effective_groups(&self) -> &[u32] {
        if self.groups.is_empty() {
            DEFAULT_GROUPS
        } else {
            &self.groups
        }
    }

    pub(crate) fn rx_capacity(&self) -> usize {
        if self.rx_messages == 0 {
            DEFAULT_MESSAGES
        } else {
            self.rx_messages
        }
    }

    pub(crate) fn tx_capacity(&self) -> usize {
        if self.tx_messages == 0 {
            DEFAULT_MESSAGES
        } else {
            self.tx_messages
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_mask() {
        let (mask, extra) = group_mask(DEFAULT_GROUPS);
        assert_eq!(
            mask,
            (1 << 0) | (1 << 2) | (1 << 4) | (1 << 5) | (1 << 6) | (1 << 8) | (1 << 9) | (1 << 10)
                | (1 << 27)
        );
        assert!(extra.is_empty());

        let (mask, extra) = group_mask(&[groups::NOOP, groups::LINK, 33]);
        assert_eq!(mask, 1);
        assert_eq!(extra, vec![33]);
    }

    #[test]
    fn test_defaults() {
        let config = SocketConfig::default();
        assert!(config.listen_all_nsid);
        assert_eq!(config.effective_groups(), DEFAULT_GROUPS);
        assert_eq!(config.rx_capacity(), DEFAULT_MESSAGES);

        let config = SocketConfig::new().groups(NSID_GROUPS).tx_messages(8);
        assert_eq!(config.effective_groups(), &[28]);
        assert_eq!(config.tx_capacity(), 8);
    }
}
