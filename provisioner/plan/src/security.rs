use crate::SiteInfo;
use ahash::AHashSet;
use vidsite_provisioner_core::{
    network::NetworkContext,
    security::{EgressRule, IngressRule, RulePeer, SecurityGroup},
    workload::BackendKind,
    Error, Result,
};

/// One layer of a security-group chain, outermost first.
pub struct Layer {
    pub name: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
    pub egress: Vec<EgressRule>,
}

/// Builds a layered chain of security groups.
///
/// Layers are created in order, gateway-first. An ingress rule may reference
/// a peer group only if that group appears earlier in the chain (or is the
/// layer itself, for intra-group traffic); anything else is a missing
/// dependency.
pub fn build(layers: Vec<Layer>) -> Result<Vec<SecurityGroup>> {
    let mut built: AHashSet<String> = AHashSet::new();
    let mut groups = Vec::with_capacity(layers.len());

    for layer in layers {
        for peer in layer
            .ingress
            .iter()
            .filter_map(|rule| match &rule.peer {
                RulePeer::Group(name) => Some(name.as_str()),
                RulePeer::Network(_) => None,
            })
        {
            if peer != layer.name && !built.contains(peer) {
                return Err(Error::dependency(&layer.name, peer));
            }
        }

        built.insert(layer.name.clone());
        groups.push(SecurityGroup {
            name: layer.name,
            description: layer.description,
            ingress: layer.ingress,
            egress: layer.egress,
        });
    }

    Ok(groups)
}

/// The two-layer chain for a site: a public gateway group, then a backend
/// group reachable only from it.
pub fn chain(
    site: &SiteInfo,
    network: &NetworkContext,
    kind: BackendKind,
) -> Result<Vec<SecurityGroup>> {
    let gateway_name = site.gateway_group_name();

    let gateway = Layer {
        name: gateway_name.clone(),
        description: format!("{} public listener", site.name),
        ingress: vec![IngressRule::tcp(site.listener_port, RulePeer::internet())],
        egress: vec![EgressRule::all_traffic()],
    };

    let mut backend_ingress = vec![IngressRule::tcp(
        site.workload_port,
        RulePeer::Group(gateway_name),
    )];
    if kind == BackendKind::ClusterNodeGroup {
        // Control-plane traffic stays inside the shared network; the open
        // internet never reaches this port.
        backend_ingress.push(IngressRule::tcp(
            site.control_plane_port,
            RulePeer::Network(network.cidr),
        ));
    }

    let backend = Layer {
        name: site.backend_group_name(),
        description: format!("{} workload, reachable only via the gateway", site.name),
        ingress: backend_ingress,
        egress: vec![EgressRule::all_traffic()],
    };

    build(vec![gateway, backend])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site_info::tests::site;

    fn network() -> NetworkContext {
        NetworkContext {
            id: "vpc-0123".to_string(),
            cidr: "10.0.0.0/16".parse().unwrap(),
            subnets: vec![],
        }
    }

    #[test]
    fn only_the_gateway_group_admits_the_internet() {
        for kind in [BackendKind::ServerlessTask, BackendKind::ClusterNodeGroup] {
            let groups = chain(&site(), &network(), kind).unwrap();
            let (gateway, rest) = groups.split_first().unwrap();
            assert!(gateway.admits_internet_ingress());
            for group in rest {
                assert!(
                    !group.admits_internet_ingress(),
                    "{} admits raw internet ingress",
                    group.name
                );
            }
        }
    }

    #[test]
    fn backend_takes_ingress_by_gateway_reference() {
        let groups = chain(&site(), &network(), BackendKind::ServerlessTask).unwrap();
        let backend = &groups[1];
        assert_eq!(
            backend.ingress_group_references().collect::<Vec<_>>(),
            vec![groups[0].name.as_str()],
        );
    }

    #[test]
    fn cluster_chain_scopes_control_plane_to_network_cidr() {
        let net = network();
        let groups = chain(&site(), &net, BackendKind::ClusterNodeGroup).unwrap();
        let backend = &groups[1];
        assert!(backend
            .ingress
            .iter()
            .any(|rule| rule.peer == RulePeer::Network(net.cidr)));
        assert!(!backend.admits_internet_ingress());
    }

    #[test]
    fn forward_reference_is_a_dependency_error() {
        let out_of_order = vec![
            Layer {
                name: "backend".to_string(),
                description: String::new(),
                ingress: vec![IngressRule::tcp(
                    8000.try_into().unwrap(),
                    RulePeer::Group("gateway".to_string()),
                )],
                egress: vec![EgressRule::all_traffic()],
            },
            Layer {
                name: "gateway".to_string(),
                description: String::new(),
                ingress: vec![IngressRule::tcp(
                    80.try_into().unwrap(),
                    RulePeer::internet(),
                )],
                egress: vec![EgressRule::all_traffic()],
            },
        ];

        let err = build(out_of_order).unwrap_err();
        assert_eq!(err, Error::dependency("backend", "gateway"));
    }

    #[test]
    fn self_reference_is_permitted() {
        let layers = vec![Layer {
            name: "nodes".to_string(),
            description: String::new(),
            ingress: vec![IngressRule::tcp(
                10250.try_into().unwrap(),
                RulePeer::Group("nodes".to_string()),
            )],
            egress: vec![EgressRule::all_traffic()],
        }];
        assert!(build(layers).is_ok());
    }
}
