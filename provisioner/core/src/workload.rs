use serde::{Deserialize, Serialize};
use std::{fmt, num::NonZeroU16};

/// The compute backend a workload runs on.
///
/// Both kinds expose the same external contract: a reachable target group, a
/// health-check path, and environment-driven configuration. Switching kinds
/// is a full replace, never a migration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// One task definition with a fixed desired count; targets register by
    /// address.
    ServerlessTask,

    /// A fixed-size set of worker nodes with the workload scheduled onto
    /// them; targets register through the node group's scaling-group
    /// attachment.
    ClusterNodeGroup,
}

/// A reference into the external secret store.
///
/// Only the reference travels in a workload spec; the value is resolved by
/// the platform at launch and never appears here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretRef(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvValue {
    Literal(String),
    Secret(SecretRef),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: EnvValue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu_millis: u32,
    pub memory_mib: u32,
}

/// A liveness or readiness HTTP probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub path: String,
    pub port: NonZeroU16,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probes {
    pub liveness: Probe,
    pub readiness: Probe,
}

/// A compute workload, independent of the backend kind it lands on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeWorkload {
    pub name: String,
    pub image: String,
    pub port: NonZeroU16,
    pub env: Vec<EnvVar>,
    pub resources: Resources,
    pub replicas: u32,
    pub probes: Probes,
}

// === impl BackendKind ===

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "serverless-task" => Ok(Self::ServerlessTask),
            "cluster-node-group" => Ok(Self::ClusterNodeGroup),
            s => anyhow::bail!("invalid backend kind: {:?}", s),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerlessTask => "serverless-task".fmt(f),
            Self::ClusterNodeGroup => "cluster-node-group".fmt(f),
        }
    }
}

// === impl EnvValue ===

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => v.fmt(f),
            Self::Secret(SecretRef(key)) => write!(f, "secretref:{}", key),
        }
    }
}

// === impl EnvVar ===

impl EnvVar {
    pub fn literal(name: impl ToString, value: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            value: EnvValue::Literal(value.to_string()),
        }
    }

    pub fn secret(name: impl ToString, key: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            value: EnvValue::Secret(SecretRef(key.to_string())),
        }
    }
}

// === impl ComputeWorkload ===

impl ComputeWorkload {
    /// Looks up a literal environment value by name.
    pub fn literal_env(&self, name: &str) -> Option<&str> {
        self.env.iter().find_map(|var| match &var.value {
            EnvValue::Literal(v) if var.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// Whether every credential-like entry is bound by secret reference.
    pub fn secrets_by_reference(&self, names: &[&str]) -> bool {
        names.iter().all(|name| {
            self.env
                .iter()
                .any(|var| var.name == *name && matches!(var.value, EnvValue::Secret(_)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_displayed() {
        for kind in [BackendKind::ServerlessTask, BackendKind::ClusterNodeGroup] {
            assert_eq!(
                kind.to_string().parse::<BackendKind>().unwrap(),
                kind,
                "failed to parse displayed {:?}",
                kind
            );
        }
        assert!("fargate".parse::<BackendKind>().is_err());
    }

    #[test]
    fn secret_values_never_display() {
        let var = EnvVar::secret("AWS_SECRET_ACCESS_KEY", "creds/secret-key");
        assert_eq!(var.value.to_string(), "secretref:creds/secret-key");
    }
}
