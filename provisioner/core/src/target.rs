use crate::gateway::ListenerProtocol;
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU16, time::Duration};

/// How a load balancer registers backends into a target group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    /// Direct registration by address. Used by serverless tasks.
    Ip,

    /// Registration by instance, via a scaling-group attachment. Used by
    /// cluster node groups.
    Instance,
}

/// The health probe a target group runs against its backends.
///
/// The path and matcher must agree with the workload's own readiness
/// endpoint, and with the orchestrator's probes, or the two health views
/// diverge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval: Duration,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,

    /// The HTTP status a check must observe to count as healthy.
    pub matcher: u16,
}

/// The backend abstraction a listener forwards matched traffic to,
/// independent of compute kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub name: String,
    pub port: NonZeroU16,
    pub protocol: ListenerProtocol,
    pub target_type: TargetType,
    pub health_check: HealthCheck,
}

// === impl HealthCheck ===

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            interval: Duration::from_secs(30),
            healthy_threshold: 2,
            unhealthy_threshold: 3,
            matcher: 200,
        }
    }
}
