use crate::SiteInfo;
use serde::{Deserialize, Serialize};
use vidsite_provisioner_core::{
    target::{TargetGroup, TargetType},
    workload::{BackendKind, ComputeWorkload, EnvVar, Probe, Probes},
    Error, Result,
};

/// A fixed-size set of cluster worker nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    pub name: String,
    pub instance_type: String,
    pub desired_size: u32,
}

/// A workload bound to its target group, ready for convergence.
///
/// Exactly one of these attaches to a given target group at a time;
/// switching the backend kind is a full replace, not a migration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedWorkload {
    pub kind: BackendKind,
    pub workload: ComputeWorkload,
    pub target_group: String,

    /// Cluster backend only: the node group the workload schedules onto.
    pub node_group: Option<NodeGroup>,
}

/// Binds a workload to a compute backend and its target group.
///
/// Both kinds come out with the identical external contract: the same
/// target group, the same health-check path, and the same environment
/// surface. Probes are derived from the target group's health check so the
/// orchestrator and the gateway can never disagree about what healthy means.
pub fn provision(
    kind: BackendKind,
    site: &SiteInfo,
    mut workload: ComputeWorkload,
    target_group: &TargetGroup,
) -> Result<DeployedWorkload> {
    if workload.port != target_group.port {
        return Err(Error::configuration(
            &workload.name,
            format!(
                "workload listens on {} but target group {} forwards to {}",
                workload.port, target_group.name, target_group.port
            ),
        ));
    }

    let expected_type = target_type(kind);
    if target_group.target_type != expected_type {
        return Err(Error::configuration(
            &target_group.name,
            format!(
                "{} backends register by {:?}, target group uses {:?}",
                kind, expected_type, target_group.target_type
            ),
        ));
    }

    let probe = Probe {
        path: target_group.health_check.path.clone(),
        port: target_group.port,
    };
    workload.probes = Probes {
        liveness: probe.clone(),
        readiness: probe,
    };

    let node_group = match kind {
        BackendKind::ServerlessTask => None,
        BackendKind::ClusterNodeGroup => Some(NodeGroup {
            name: site.node_group_name(),
            instance_type: site.workload.instance_type.clone(),
            desired_size: site.workload.replicas,
        }),
    };

    Ok(DeployedWorkload {
        kind,
        workload,
        target_group: target_group.name.clone(),
        node_group,
    })
}

/// How a backend kind registers into its target group.
pub fn target_type(kind: BackendKind) -> TargetType {
    match kind {
        BackendKind::ServerlessTask => TargetType::Ip,
        BackendKind::ClusterNodeGroup => TargetType::Instance,
    }
}

/// The uniform environment surface every workload receives, regardless of
/// backend kind. Credential-valued entries are bound by secret reference.
pub fn runtime_env(site: &SiteInfo) -> Vec<EnvVar> {
    vec![
        EnvVar::literal("AWS_REGION", &site.region),
        EnvVar::literal("S3_BUCKET_NAME", &site.storage_bucket),
        EnvVar::literal("SQS_QUEUE_URL", &site.queue_url),
        EnvVar::literal("NOTIFICATION_SERVICE_URL", &site.notification_url),
        EnvVar::literal("PORT", site.workload_port),
        EnvVar::literal("LOG_LEVEL", &site.log_level),
        EnvVar::secret(
            "API_SECURITY_INTERNAL_TOKEN",
            &site.secrets.internal_token.0,
        ),
        EnvVar::secret("AWS_ACCESS_KEY_ID", &site.secrets.access_key_id.0),
        EnvVar::secret("AWS_SECRET_ACCESS_KEY", &site.secrets.secret_access_key.0),
        EnvVar::secret("AWS_SESSION_TOKEN", &site.secrets.session_token.0),
    ]
}

/// The site's workload, environment included.
pub fn workload(site: &SiteInfo) -> ComputeWorkload {
    let probe = Probe {
        path: site.health_check.path.clone(),
        port: site.workload_port,
    };
    ComputeWorkload {
        name: site.service_name(),
        image: site.workload.image.clone(),
        port: site.workload_port,
        env: runtime_env(site),
        resources: site.resources(),
        replicas: site.workload.replicas,
        probes: Probes {
            liveness: probe.clone(),
            readiness: probe,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site_info::tests::site;
    use maplit::hashset;
    use std::collections::HashSet;
    use vidsite_provisioner_core::{gateway::ListenerProtocol, target::HealthCheck};

    const SECRET_NAMES: &[&str] = &[
        "API_SECURITY_INTERNAL_TOKEN",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
    ];

    fn target_group(target_type: TargetType) -> TargetGroup {
        TargetGroup {
            name: "video-api-tg".to_string(),
            port: 8000.try_into().unwrap(),
            protocol: ListenerProtocol::Http,
            target_type,
            health_check: HealthCheck::default(),
        }
    }

    #[test]
    fn both_kinds_receive_the_same_environment() {
        let site = site();
        let serverless = provision(
            BackendKind::ServerlessTask,
            &site,
            workload(&site),
            &target_group(TargetType::Ip),
        )
        .unwrap();
        let cluster = provision(
            BackendKind::ClusterNodeGroup,
            &site,
            workload(&site),
            &target_group(TargetType::Instance),
        )
        .unwrap();

        assert_eq!(serverless.workload.env, cluster.workload.env);

        let names = serverless
            .workload
            .env
            .iter()
            .map(|var| var.name.clone())
            .collect::<HashSet<_>>();
        assert_eq!(
            names,
            hashset! {
                "AWS_REGION".to_string(),
                "S3_BUCKET_NAME".to_string(),
                "SQS_QUEUE_URL".to_string(),
                "NOTIFICATION_SERVICE_URL".to_string(),
                "PORT".to_string(),
                "LOG_LEVEL".to_string(),
                "API_SECURITY_INTERNAL_TOKEN".to_string(),
                "AWS_ACCESS_KEY_ID".to_string(),
                "AWS_SECRET_ACCESS_KEY".to_string(),
                "AWS_SESSION_TOKEN".to_string(),
            },
        );
    }

    #[test]
    fn credentials_are_bound_by_reference() {
        let site = site();
        let workload = workload(&site);
        assert!(workload.secrets_by_reference(SECRET_NAMES));
        assert_eq!(workload.literal_env("AWS_REGION"), Some("us-east-1"));
        assert_eq!(workload.literal_env("PORT"), Some("8000"));
        assert_eq!(workload.literal_env("AWS_SECRET_ACCESS_KEY"), None);
    }

    #[test]
    fn probes_agree_with_the_target_group_health_check() {
        let site = site();
        let tg = target_group(TargetType::Ip);
        let deployed =
            provision(BackendKind::ServerlessTask, &site, workload(&site), &tg).unwrap();

        assert_eq!(deployed.workload.probes.readiness.path, tg.health_check.path);
        assert_eq!(deployed.workload.probes.readiness.port, tg.port);
        assert_eq!(
            deployed.workload.probes.liveness,
            deployed.workload.probes.readiness
        );
    }

    #[test]
    fn port_mismatch_is_a_configuration_error() {
        let site = site();
        let mut w = workload(&site);
        w.port = 9000.try_into().unwrap();
        let err = provision(
            BackendKind::ServerlessTask,
            &site,
            w,
            &target_group(TargetType::Ip),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn target_type_must_fit_the_kind() {
        let site = site();
        let err = provision(
            BackendKind::ServerlessTask,
            &site,
            workload(&site),
            &target_group(TargetType::Instance),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        let cluster = provision(
            BackendKind::ClusterNodeGroup,
            &site,
            workload(&site),
            &target_group(TargetType::Instance),
        )
        .unwrap();
        assert_eq!(
            cluster.node_group.as_ref().map(|ng| ng.name.as_str()),
            Some("video-api-nodes"),
        );
    }
}
