use anyhow::Result;
use parking_lot::Mutex;
use vidsite_provisioner_core::{
    gateway::GatewaySpec, network::NetworkContext, security::SecurityGroup, target::TargetGroup,
};
use vidsite_provisioner_plan::{backend::NodeGroup, DeployedWorkload};

/// Mutates the cloud into the desired state, one entity at a time.
///
/// Every method returns the provider-assigned id of the created entity;
/// the convergence engine records ids in state and hands them back when a
/// later entity references an earlier one.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn create_security_group(
        &self,
        network: &NetworkContext,
        group: &SecurityGroup,
    ) -> Result<String>;

    async fn create_target_group(
        &self,
        network: &NetworkContext,
        group: &TargetGroup,
    ) -> Result<String>;

    async fn create_gateway(
        &self,
        spec: &GatewaySpec,
        subnets: &[String],
        security_group: &str,
    ) -> Result<String>;

    async fn create_serverless_service(
        &self,
        workload: &DeployedWorkload,
        subnets: &[String],
        security_group: &str,
        target_group: &str,
    ) -> Result<String>;

    async fn create_node_group(
        &self,
        group: &NodeGroup,
        subnets: &[String],
        security_group: &str,
    ) -> Result<String>;

    /// Resolves only once the node group reports ready. Target-group
    /// attachment is ordered after this signal.
    async fn await_node_group_ready(&self, id: &str) -> Result<()>;

    async fn attach_node_group(&self, target_group: &str, node_group: &str) -> Result<()>;

    async fn create_cluster_workload(
        &self,
        workload: &DeployedWorkload,
        node_group: &str,
    ) -> Result<String>;

    async fn destroy(&self, kind: &str, id: &str) -> Result<()>;
}

/// Records intended mutations in the log without reaching any cloud API.
///
/// This is the provider behind plan preview; real cloud bindings implement
/// [`Provider`] out of tree and slot in unchanged.
#[derive(Debug, Default)]
pub struct LogProvider {
    next: Mutex<u64>,
}

// === impl LogProvider ===

impl LogProvider {
    fn next_id(&self, kind: &str) -> String {
        let mut next = self.next.lock();
        *next += 1;
        format!("{}-{:04}", kind, next)
    }
}

#[async_trait::async_trait]
impl Provider for LogProvider {
    async fn create_security_group(
        &self,
        network: &NetworkContext,
        group: &SecurityGroup,
    ) -> Result<String> {
        tracing::info!(
            network = %network.id,
            group = %group.name,
            ingress = group.ingress.len(),
            "would create security group"
        );
        Ok(self.next_id("sg"))
    }

    async fn create_target_group(
        &self,
        network: &NetworkContext,
        group: &TargetGroup,
    ) -> Result<String> {
        tracing::info!(
            network = %network.id,
            group = %group.name,
            port = %group.port,
            health = %group.health_check.path,
            "would create target group"
        );
        Ok(self.next_id("tg"))
    }

    async fn create_gateway(
        &self,
        spec: &GatewaySpec,
        subnets: &[String],
        security_group: &str,
    ) -> Result<String> {
        tracing::info!(
            port = %spec.listener.port,
            rules = spec.rules.len(),
            ?subnets,
            security_group,
            "would create gateway"
        );
        Ok(self.next_id("gw"))
    }

    async fn create_serverless_service(
        &self,
        workload: &DeployedWorkload,
        subnets: &[String],
        security_group: &str,
        target_group: &str,
    ) -> Result<String> {
        tracing::info!(
            service = %workload.workload.name,
            image = %workload.workload.image,
            replicas = workload.workload.replicas,
            ?subnets,
            security_group,
            target_group,
            "would create serverless service"
        );
        Ok(self.next_id("svc"))
    }

    async fn create_node_group(
        &self,
        group: &NodeGroup,
        subnets: &[String],
        security_group: &str,
    ) -> Result<String> {
        tracing::info!(
            group = %group.name,
            instance_type = %group.instance_type,
            desired = group.desired_size,
            ?subnets,
            security_group,
            "would create node group"
        );
        Ok(self.next_id("ng"))
    }

    async fn await_node_group_ready(&self, id: &str) -> Result<()> {
        tracing::info!(id, "would wait for node group readiness");
        Ok(())
    }

    async fn attach_node_group(&self, target_group: &str, node_group: &str) -> Result<()> {
        tracing::info!(target_group, node_group, "would attach node group");
        Ok(())
    }

    async fn create_cluster_workload(
        &self,
        workload: &DeployedWorkload,
        node_group: &str,
    ) -> Result<String> {
        tracing::info!(
            workload = %workload.workload.name,
            image = %workload.workload.image,
            node_group,
            "would create cluster workload"
        );
        Ok(self.next_id("wl"))
    }

    async fn destroy(&self, kind: &str, id: &str) -> Result<()> {
        tracing::info!(kind, id, "would destroy");
        Ok(())
    }
}
