use crate::{
    metrics::ConvergeMetrics,
    provider::Provider,
    state::{fingerprint, Record, StateHandle, StateStore},
};
use anyhow::{Context, Result};
use chrono::Utc;
use vidsite_provisioner_core::{network::NetworkContext, Error};
use vidsite_provisioner_plan::{Node, NodeKind, ResourceGraph};

/// What a run did, entity by entity.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

enum Outcome {
    Applied,
    Skipped,
}

/// Walks a resource graph in dependency order, converging each entity
/// through the provider.
///
/// A run either reaches the fully-described state or aborts on the first
/// error, leaving everything already converged untouched. There is no
/// rollback; an aborted run names the failing entity and expects an
/// operator.
pub struct Converger<P, S> {
    provider: P,
    state: StateHandle<S>,
    metrics: Option<ConvergeMetrics>,
}

// === impl Converger ===

impl<P: Provider, S: StateStore> Converger<P, S> {
    pub fn new(provider: P, state: StateHandle<S>) -> Self {
        Self {
            provider,
            state,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ConvergeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &StateHandle<S> {
        &self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn converge(
        &self,
        network: &NetworkContext,
        graph: &ResourceGraph,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for node in graph.topo_order()? {
            match self.converge_node(network, node).await {
                Ok(Outcome::Applied) => {
                    self.count(node, "applied");
                    tracing::info!(entity = %node.name, kind = node.kind.kind_name(), "converged");
                    summary.applied.push(node.name.clone());
                }
                Ok(Outcome::Skipped) => {
                    self.count(node, "skipped");
                    summary.skipped.push(node.name.clone());
                }
                Err(error) => {
                    self.count(node, "failed");
                    if let Some(metrics) = &self.metrics {
                        metrics.run("aborted");
                    }
                    tracing::error!(entity = %node.name, %error, "convergence run aborted");
                    return Err(error.context(format!("converging {}", node.name)));
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.run("converged");
        }
        Ok(summary)
    }

    /// Tears down everything the graph describes, reverse dependency order.
    ///
    /// Entities absent from state are skipped; the shared network and other
    /// read-only inputs are never touched.
    pub async fn destroy(&self, graph: &ResourceGraph) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for node in graph.reverse_order()? {
            let Some(record) = self.state.get(&node.name) else {
                summary.skipped.push(node.name.clone());
                continue;
            };

            // Readiness barriers provision nothing.
            if !matches!(node.kind, NodeKind::NodeGroupReady { .. }) {
                self.provider
                    .destroy(&record.kind, &record.id)
                    .await
                    .with_context(|| format!("destroying {}", node.name))?;
            }

            self.state.release_claims_of(&node.name)?;
            self.state.remove(&node.name)?;
            tracing::info!(entity = %node.name, "destroyed");
            summary.applied.push(node.name.clone());
        }

        Ok(summary)
    }

    async fn converge_node(&self, network: &NetworkContext, node: &Node) -> Result<Outcome> {
        let fp = fingerprint(&node.kind)?;

        if let Some(record) = self.state.get(&node.name) {
            if record.fingerprint == fp {
                tracing::debug!(entity = %node.name, "already converged");
                return Ok(Outcome::Skipped);
            }
            // The entity no longer matches its description; replace it.
            tracing::warn!(entity = %node.name, "spec changed, replacing");
            self.provider.destroy(&record.kind, &record.id).await?;
            self.state.remove(&node.name)?;
        }

        if let Some(target_group) = node.kind.claims_target_group() {
            self.state.claim_target_group(target_group, &node.name)?;
        }

        let id = self.apply(network, node).await?;
        self.state.record(
            &node.name,
            Record {
                id,
                kind: node.kind.kind_name().to_string(),
                fingerprint: fp,
                converged_at: Utc::now(),
            },
        )?;
        Ok(Outcome::Applied)
    }

    async fn apply(&self, network: &NetworkContext, node: &Node) -> Result<String> {
        match &node.kind {
            NodeKind::SecurityGroup(group) => {
                self.provider.create_security_group(network, group).await
            }

            NodeKind::TargetGroup(group) => self.provider.create_target_group(network, group).await,

            NodeKind::Gateway {
                spec,
                subnets,
                security_group,
            } => {
                let sg = self.entity_id(&node.name, security_group)?;
                self.provider.create_gateway(spec, subnets, &sg).await
            }

            NodeKind::ServerlessService {
                deployed,
                subnets,
                security_group,
            } => {
                let sg = self.entity_id(&node.name, security_group)?;
                let tg = self.entity_id(&node.name, &deployed.target_group)?;
                self.provider
                    .create_serverless_service(deployed, subnets, &sg, &tg)
                    .await
            }

            NodeKind::NodeGroup {
                group,
                subnets,
                security_group,
            } => {
                let sg = self.entity_id(&node.name, security_group)?;
                self.provider.create_node_group(group, subnets, &sg).await
            }

            NodeKind::NodeGroupReady { node_group } => {
                let id = self.entity_id(&node.name, node_group)?;
                self.provider.await_node_group_ready(&id).await?;
                Ok(id)
            }

            NodeKind::TargetAttachment {
                target_group,
                node_group,
            } => {
                let tg = self.entity_id(&node.name, target_group)?;
                let ng = self.entity_id(&node.name, node_group)?;
                self.provider.attach_node_group(&tg, &ng).await?;
                Ok(format!("{}/{}", tg, ng))
            }

            NodeKind::ClusterWorkload {
                deployed,
                node_group,
            } => {
                let ng = self.entity_id(&node.name, node_group)?;
                self.provider.create_cluster_workload(deployed, &ng).await
            }
        }
    }

    /// The provider id of an already-converged entity.
    fn entity_id(&self, entity: &str, dependency: &str) -> Result<String> {
        self.state
            .get(dependency)
            .map(|record| record.id)
            .ok_or_else(|| Error::dependency(entity, dependency).into())
    }

    fn count(&self, node: &Node, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.entity(node.kind.kind_name(), outcome);
        }
    }
}
