use crate::{backend, gateway, security, subnet, DeployedWorkload, SiteInfo};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use vidsite_provisioner_core::{
    gateway::GatewaySpec,
    network::NetworkContext,
    security::SecurityGroup,
    target::TargetGroup,
    workload::BackendKind,
    Error, Result,
};

/// The desired spec carried by a graph node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    SecurityGroup(SecurityGroup),

    TargetGroup(TargetGroup),

    Gateway {
        spec: GatewaySpec,
        subnets: Vec<String>,
        security_group: String,
    },

    ServerlessService {
        deployed: DeployedWorkload,
        subnets: Vec<String>,
        security_group: String,
    },

    NodeGroup {
        group: backend::NodeGroup,
        subnets: Vec<String>,
        security_group: String,
    },

    /// A barrier that resolves once the node group reports ready. Anything
    /// ordered after it (notably the target-group attachment) converges only
    /// past that signal.
    NodeGroupReady { node_group: String },

    TargetAttachment {
        target_group: String,
        node_group: String,
    },

    ClusterWorkload {
        deployed: DeployedWorkload,
        node_group: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,

    /// Names of nodes that must be converged before this one.
    pub deps: Vec<String>,
}

/// A dependency-ordered set of desired entities.
///
/// The declarative source expressed ordering implicitly; here every
/// prerequisite is an explicit edge and evaluation is topological.
#[derive(Clone, Debug, Default)]
pub struct ResourceGraph {
    nodes: Vec<Node>,
    by_name: AHashMap<String, usize>,
}

// === impl NodeKind ===

impl NodeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::SecurityGroup(_) => "security-group",
            Self::TargetGroup(_) => "target-group",
            Self::Gateway { .. } => "gateway",
            Self::ServerlessService { .. } => "serverless-service",
            Self::NodeGroup { .. } => "node-group",
            Self::NodeGroupReady { .. } => "node-group-ready",
            Self::TargetAttachment { .. } => "target-attachment",
            Self::ClusterWorkload { .. } => "cluster-workload",
        }
    }

    /// The target group this node claims exclusive ownership of, if any.
    pub fn claims_target_group(&self) -> Option<&str> {
        match self {
            Self::ServerlessService { deployed, .. } => Some(&deployed.target_group),
            Self::TargetAttachment { target_group, .. } => Some(target_group),
            _ => None,
        }
    }
}

// === impl ResourceGraph ===

impl ResourceGraph {
    pub fn push(&mut self, node: Node) -> Result<()> {
        if self.by_name.contains_key(&node.name) {
            return Err(Error::configuration(
                &node.name,
                "entity declared more than once",
            ));
        }
        self.by_name.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in dependency order, stable with respect to declaration order.
    ///
    /// A dependency on an undeclared node and a dependency cycle are both
    /// plan defects, reported against the node that carries them.
    pub fn topo_order(&self) -> Result<Vec<&Node>> {
        for node in &self.nodes {
            for dep in &node.deps {
                if !self.by_name.contains_key(dep) {
                    return Err(Error::dependency(&node.name, dep));
                }
            }
        }

        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut placed: AHashSet<&str> = AHashSet::new();

        while ordered.len() < self.nodes.len() {
            let mut progressed = false;
            for node in &self.nodes {
                if placed.contains(node.name.as_str()) {
                    continue;
                }
                if node.deps.iter().all(|dep| placed.contains(dep.as_str())) {
                    placed.insert(&node.name);
                    ordered.push(node);
                    progressed = true;
                }
            }
            if !progressed {
                let stuck = self
                    .nodes
                    .iter()
                    .find(|node| !placed.contains(node.name.as_str()))
                    .expect("an unplaced node must exist");
                return Err(Error::configuration(
                    &stuck.name,
                    "dependency cycle in resource graph",
                ));
            }
        }

        Ok(ordered)
    }

    /// Reverse dependency order, for teardown.
    pub fn reverse_order(&self) -> Result<Vec<&Node>> {
        let mut order = self.topo_order()?;
        order.reverse();
        Ok(order)
    }
}

/// Assembles the full resource graph for a site.
pub fn plan(site: &SiteInfo, network: &NetworkContext, kind: BackendKind) -> Result<ResourceGraph> {
    site.validate()?;

    let allowed = site.allowed_zones.iter().cloned().collect();
    let subnets = subnet::select(&network.subnets, &allowed, site.max_subnets)?;

    let groups = security::chain(site, network, kind)?;

    let target_group = TargetGroup {
        name: site.target_group_name(),
        port: site.workload_port,
        protocol: vidsite_provisioner_core::gateway::ListenerProtocol::Http,
        target_type: backend::target_type(kind),
        health_check: site.health_check.clone(),
    };

    let gateway_spec = gateway::configure(
        site.listener_port,
        &target_group,
        &site.gateway_header_name,
        &site.gateway_header_value,
    )?;

    let deployed = backend::provision(kind, site, backend::workload(site), &target_group)?;

    let gateway_sg = site.gateway_group_name();
    let backend_sg = site.backend_group_name();
    let tg_name = target_group.name.clone();

    let mut graph = ResourceGraph::default();
    let mut sg_deps: Vec<String> = Vec::new();
    for group in groups {
        let name = group.name.clone();
        graph.push(Node {
            name: name.clone(),
            kind: NodeKind::SecurityGroup(group),
            deps: sg_deps.clone(),
        })?;
        // Each layer references the one before it.
        sg_deps = vec![name];
    }

    graph.push(Node {
        name: tg_name.clone(),
        kind: NodeKind::TargetGroup(target_group),
        deps: vec![],
    })?;

    graph.push(Node {
        name: site.gateway_name(),
        kind: NodeKind::Gateway {
            spec: gateway_spec,
            subnets: subnets.clone(),
            security_group: gateway_sg,
        },
        deps: vec![site.gateway_group_name(), tg_name.clone()],
    })?;

    match kind {
        BackendKind::ServerlessTask => {
            graph.push(Node {
                name: site.service_name(),
                kind: NodeKind::ServerlessService {
                    deployed,
                    subnets,
                    security_group: backend_sg.clone(),
                },
                deps: vec![backend_sg, tg_name],
            })?;
        }
        BackendKind::ClusterNodeGroup => {
            let group = deployed
                .node_group
                .clone()
                .expect("cluster workloads carry a node group");
            let ng_name = group.name.clone();
            let ready_name = format!("{}-ready", ng_name);

            graph.push(Node {
                name: ng_name.clone(),
                kind: NodeKind::NodeGroup {
                    group,
                    subnets,
                    security_group: backend_sg.clone(),
                },
                deps: vec![backend_sg],
            })?;

            graph.push(Node {
                name: ready_name.clone(),
                kind: NodeKind::NodeGroupReady {
                    node_group: ng_name.clone(),
                },
                deps: vec![ng_name.clone()],
            })?;

            graph.push(Node {
                name: format!("{}-attachment", tg_name),
                kind: NodeKind::TargetAttachment {
                    target_group: tg_name.clone(),
                    node_group: ng_name.clone(),
                },
                deps: vec![ready_name.clone(), tg_name],
            })?;

            graph.push(Node {
                name: site.service_name(),
                kind: NodeKind::ClusterWorkload {
                    deployed,
                    node_group: ng_name,
                },
                deps: vec![ready_name],
            })?;
        }
    }

    tracing::info!(
        site = %site.name,
        %kind,
        entities = graph.len(),
        "assembled resource graph"
    );
    Ok(graph)
}
