use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vidsite_provisioner_core::{network::NetworkContext, workload::BackendKind};
use vidsite_provisioner_plan::SiteInfo;

/// The declarative site document: the shared network as discovered, the
/// site-wide parameters, and the compute backend to provision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteDoc {
    pub backend: BackendKind,
    pub network: NetworkContext,
    pub site: SiteInfo,
}

pub fn load(path: &Path) -> Result<SiteDoc> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading site document {}", path.display()))?;
    let doc: SiteDoc = serde_json::from_str(&raw)
        .with_context(|| format!("parsing site document {}", path.display()))?;
    doc.site.validate()?;
    Ok(doc)
}
