use ahash::AHashSet;
use vidsite_provisioner_core::{network::Subnet, Error, Result};

/// Selects the subnets a gateway may span.
///
/// Retains subnets whose zone is in the allow-list, preserves discovery
/// order, and truncates to `max_count`. The result is a deterministic
/// function of its inputs; re-running with the same subnet set yields the
/// same ids in the same order.
pub fn select(
    subnets: &[Subnet],
    allowed_zones: &AHashSet<String>,
    max_count: usize,
) -> Result<Vec<String>> {
    let selected = subnets
        .iter()
        .filter(|subnet| allowed_zones.contains(&subnet.zone))
        .take(max_count)
        .map(|subnet| subnet.id.clone())
        .collect::<Vec<_>>();

    if selected.is_empty() {
        // Provisioning continues into a network-less load balancer
        // otherwise; fail here instead.
        return Err(Error::configuration(
            "subnet-selection",
            format!("no subnets in allowed zones {:?}", allowed_zones),
        ));
    }

    tracing::debug!(count = selected.len(), "selected subnets");
    Ok(selected)
}
