use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU16;

/// The peer a rule admits traffic from or to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulePeer {
    /// A network range.
    Network(IpNet),

    /// Another security group, referenced by name. Group references keep
    /// backend rules pinned to the gateway even as its addresses change.
    Group(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    /// Any protocol, any port. Used for unrestricted egress.
    All,
}

/// An inclusive port range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub from: NonZeroU16,
    pub to: NonZeroU16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: Protocol,
    pub ports: PortRange,
    pub peer: RulePeer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressRule {
    pub protocol: Protocol,

    /// `None` means all ports.
    pub ports: Option<PortRange>,

    pub peer: RulePeer,
}

/// A named security group with its ingress and egress rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub name: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
    pub egress: Vec<EgressRule>,
}

// === impl RulePeer ===

impl RulePeer {
    /// The unrestricted IPv4 internet range.
    pub fn internet() -> Self {
        Self::Network(IpNet::V4(Ipv4Net::default()))
    }

    /// Whether this peer admits the entire internet.
    pub fn is_internet(&self) -> bool {
        matches!(self, Self::Network(net) if net.prefix_len() == 0)
    }
}

// === impl PortRange ===

impl PortRange {
    pub fn single(port: NonZeroU16) -> Self {
        Self {
            from: port,
            to: port,
        }
    }
}

// === impl IngressRule ===

impl IngressRule {
    pub fn tcp(port: NonZeroU16, peer: RulePeer) -> Self {
        Self {
            protocol: Protocol::Tcp,
            ports: PortRange::single(port),
            peer,
        }
    }
}

// === impl EgressRule ===

impl EgressRule {
    /// Unrestricted egress. Workloads reach storage, queue, and notification
    /// endpoints whose addresses are not known ahead of time.
    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            ports: None,
            peer: RulePeer::internet(),
        }
    }
}

// === impl SecurityGroup ===

impl SecurityGroup {
    /// Whether any ingress rule admits the unrestricted internet range.
    ///
    /// Only the gateway group may; every other group in a chain takes
    /// ingress by group reference or from the shared network's own CIDR.
    pub fn admits_internet_ingress(&self) -> bool {
        self.ingress.iter().any(|rule| rule.peer.is_internet())
    }

    /// Names of all groups referenced by ingress rules.
    pub fn ingress_group_references(&self) -> impl Iterator<Item = &str> {
        self.ingress.iter().filter_map(|rule| match &rule.peer {
            RulePeer::Group(name) => Some(name.as_str()),
            RulePeer::Network(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(p: u16) -> NonZeroU16 {
        NonZeroU16::new(p).unwrap()
    }

    #[test]
    fn internet_peer_is_detected() {
        assert!(RulePeer::internet().is_internet());
        assert!(!RulePeer::Network("10.0.0.0/16".parse().unwrap()).is_internet());
        assert!(!RulePeer::Group("gateway".to_string()).is_internet());
    }

    #[test]
    fn group_detects_internet_ingress() {
        let open = SecurityGroup {
            name: "gateway".to_string(),
            description: "public listener".to_string(),
            ingress: vec![IngressRule::tcp(port(80), RulePeer::internet())],
            egress: vec![EgressRule::all_traffic()],
        };
        assert!(open.admits_internet_ingress());

        let chained = SecurityGroup {
            name: "backend".to_string(),
            description: "workload".to_string(),
            ingress: vec![IngressRule::tcp(
                port(8000),
                RulePeer::Group("gateway".to_string()),
            )],
            egress: vec![EgressRule::all_traffic()],
        };
        assert!(!chained.admits_internet_ingress());
        assert_eq!(
            chained.ingress_group_references().collect::<Vec<_>>(),
            vec!["gateway"],
        );
    }
}
