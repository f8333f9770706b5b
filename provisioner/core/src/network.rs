use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// A subnet discovered in the shared network.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subnet {
    pub id: String,

    /// The availability zone the subnet lives in, e.g. "us-east-1a".
    pub zone: String,
}

/// The pre-existing shared network the engine provisions into.
///
/// This is read-only input: the engine never creates, mutates, or destroys
/// anything described here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    pub id: String,

    pub cidr: IpNet,

    /// Subnets in discovery order. Selection preserves this order.
    pub subnets: Vec<Subnet>,
}

// === impl Subnet ===

impl Subnet {
    pub fn new(id: impl ToString, zone: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            zone: zone.to_string(),
        }
    }
}
