use regex::Regex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU16;
use vidsite_provisioner_core::{
    target::HealthCheck,
    workload::{Resources, SecretRef},
    Error,
};

const ZONE_REGEX: &str = r"^[a-z]{2}(-[a-z]+)+-\d[a-z]$";

/// Holds site-wide provisioning parameters.
///
/// Sites differ only in these knobs (subnet span, health tuning, replica
/// count); the derivation logic is shared.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteInfo {
    /// Prefix for every entity name this site provisions.
    pub name: String,

    pub region: String,

    /// Zones the gateway may place subnets in. Discovered subnets outside
    /// this list are skipped.
    pub allowed_zones: Vec<String>,

    /// Maximum number of subnets the gateway spans.
    #[serde(default = "default_max_subnets")]
    pub max_subnets: usize,

    /// Public listener port on the gateway.
    #[serde(default = "default_listener_port")]
    pub listener_port: NonZeroU16,

    /// Port the workload container listens on.
    #[serde(default = "default_workload_port")]
    pub workload_port: NonZeroU16,

    /// Intra-cluster control-plane port, scoped to the shared network's own
    /// CIDR. Cluster backend only.
    #[serde(default = "default_control_plane_port")]
    pub control_plane_port: NonZeroU16,

    /// Header an inbound request must carry before the gateway forwards it.
    pub gateway_header_name: String,
    pub gateway_header_value: String,

    #[serde(default)]
    pub health_check: HealthCheck,

    pub storage_bucket: String,
    pub queue_url: String,
    pub notification_url: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub workload: WorkloadParams,

    pub secrets: SecretBindings,
}

/// Workload parameters shared by both compute backends.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkloadParams {
    pub image: String,

    #[serde(default = "default_replicas")]
    pub replicas: u32,

    #[serde(default = "default_cpu_millis")]
    pub cpu_millis: u32,

    #[serde(default = "default_memory_mib")]
    pub memory_mib: u32,

    /// Instance type for cluster worker nodes.
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
}

/// Where credential-valued environment entries resolve from.
///
/// These are references into the external secret store; the engine never
/// sees the values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretBindings {
    pub access_key_id: SecretRef,
    pub secret_access_key: SecretRef,
    pub session_token: SecretRef,
    pub internal_token: SecretRef,
}

fn default_max_subnets() -> usize {
    2
}

fn default_listener_port() -> NonZeroU16 {
    NonZeroU16::new(80).unwrap()
}

fn default_workload_port() -> NonZeroU16 {
    NonZeroU16::new(8000).unwrap()
}

fn default_control_plane_port() -> NonZeroU16 {
    NonZeroU16::new(443).unwrap()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_replicas() -> u32 {
    1
}

fn default_cpu_millis() -> u32 {
    256
}

fn default_memory_mib() -> u32 {
    512
}

fn default_instance_type() -> String {
    "t3.medium".to_string()
}

// === impl SiteInfo ===

impl SiteInfo {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::configuration("site", "name must not be empty"));
        }
        if self.allowed_zones.is_empty() {
            return Err(Error::configuration(
                "site",
                "at least one allowed zone is required",
            ));
        }
        if self.max_subnets == 0 {
            return Err(Error::configuration(
                "site",
                "max_subnets must be at least 1",
            ));
        }

        let zone = Regex::new(ZONE_REGEX).expect("should_compile");
        for z in &self.allowed_zones {
            if !zone.is_match(z) {
                return Err(Error::configuration(
                    "site",
                    format!("{:?} is not an availability zone", z),
                ));
            }
            if !z.starts_with(&self.region) {
                return Err(Error::configuration(
                    "site",
                    format!("zone {:?} is outside region {:?}", z, self.region),
                ));
            }
        }
        Ok(())
    }

    pub fn gateway_group_name(&self) -> String {
        format!("{}-gateway-sg", self.name)
    }

    pub fn backend_group_name(&self) -> String {
        format!("{}-backend-sg", self.name)
    }

    pub fn target_group_name(&self) -> String {
        format!("{}-tg", self.name)
    }

    pub fn gateway_name(&self) -> String {
        format!("{}-gateway", self.name)
    }

    pub fn service_name(&self) -> String {
        format!("{}-service", self.name)
    }

    pub fn node_group_name(&self) -> String {
        format!("{}-nodes", self.name)
    }

    pub fn resources(&self) -> Resources {
        Resources {
            cpu_millis: self.workload.cpu_millis,
            memory_mib: self.workload.memory_mib,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn site() -> SiteInfo {
        SiteInfo {
            name: "video-api".to_string(),
            region: "us-east-1".to_string(),
            allowed_zones: vec![
                "us-east-1a".to_string(),
                "us-east-1b".to_string(),
                "us-east-1c".to_string(),
            ],
            max_subnets: 2,
            listener_port: 80.try_into().unwrap(),
            workload_port: 8000.try_into().unwrap(),
            control_plane_port: 443.try_into().unwrap(),
            gateway_header_name: "x-apigateway-token".to_string(),
            gateway_header_value: "tech-challenge-hackathon".to_string(),
            health_check: HealthCheck::default(),
            storage_bucket: "video-api-uploads".to_string(),
            queue_url: "https://sqs.us-east-1.amazonaws.com/123456789012/video-jobs"
                .to_string(),
            notification_url: "https://notify.example.com".to_string(),
            log_level: "INFO".to_string(),
            workload: WorkloadParams {
                image: "registry.example.com/video-api:latest".to_string(),
                replicas: 1,
                cpu_millis: 256,
                memory_mib: 512,
                instance_type: "t3.medium".to_string(),
            },
            secrets: SecretBindings {
                access_key_id: SecretRef("creds/access-key-id".to_string()),
                secret_access_key: SecretRef("creds/secret-access-key".to_string()),
                session_token: SecretRef("creds/session-token".to_string()),
                internal_token: SecretRef("creds/internal-token".to_string()),
            },
        }
    }

    #[test]
    fn valid_site_passes() {
        assert!(site().validate().is_ok());
    }

    #[test]
    fn rejects_malformed_zone() {
        let mut s = site();
        s.allowed_zones.push("us-east".to_string());
        assert!(matches!(
            s.validate().unwrap_err(),
            Error::Configuration { .. }
        ));
    }

    #[test]
    fn rejects_zone_outside_region() {
        let mut s = site();
        s.allowed_zones.push("eu-west-1a".to_string());
        assert!(matches!(
            s.validate().unwrap_err(),
            Error::Configuration { .. }
        ));
    }

    #[test]
    fn rejects_zero_subnet_span() {
        let mut s = site();
        s.max_subnets = 0;
        assert!(matches!(
            s.validate().unwrap_err(),
            Error::Configuration { .. }
        ));
    }
}
