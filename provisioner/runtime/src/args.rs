use crate::site;
use anyhow::{Context, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vidsite_provisioner_core::{workload::BackendKind, PROVISIONER_NAME};
use vidsite_provisioner_engine::{ConvergeMetrics, Converger, FileStore, LogProvider, StateHandle};
use vidsite_provisioner_plan::graph;

#[derive(Debug, Parser)]
#[clap(
    name = "vidsite-provisioner",
    about = "Derives and converges the video-processing site footprint"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "vidsite=info,warn",
        env = "VIDSITE_PROVISIONER_LOG"
    )]
    log_level: String,

    /// Path of the site description document.
    #[clap(long, env = "VIDSITE_SITE_DOC")]
    site: PathBuf,

    /// Path of the persisted convergence state.
    #[clap(long, default_value = "vidsite-state.json")]
    state: PathBuf,

    /// Overrides the compute backend declared in the site document.
    #[clap(long)]
    backend: Option<BackendKind>,

    /// Prints the plan without converging anything.
    #[clap(long)]
    dry_run: bool,

    /// Tears down everything recorded in state, reverse dependency order.
    #[clap(long)]
    destroy: bool,
}

// === impl Args ===

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            site,
            state,
            backend,
            dry_run,
            destroy,
        } = self;

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_new(&log_level).context("parsing log level")?)
            .init();

        info!(controller = %PROVISIONER_NAME, "starting");

        let doc = site::load(&site)?;
        let kind = backend.unwrap_or(doc.backend);
        let graph = graph::plan(&doc.site, &doc.network, kind)?;
        info!(site = %doc.site.name, %kind, entities = graph.len(), "plan assembled");

        if dry_run {
            for node in graph.topo_order()? {
                info!(
                    entity = %node.name,
                    kind = node.kind.kind_name(),
                    deps = ?node.deps,
                    "planned"
                );
            }
            return Ok(());
        }

        let mut prom = <Registry>::default();
        let metrics = ConvergeMetrics::register(prom.sub_registry_with_prefix("converge"));

        let handle = StateHandle::load(FileStore::new(state))?;
        let converger = Converger::new(LogProvider::default(), handle).with_metrics(metrics);

        let summary = if destroy {
            converger.destroy(&graph).await?
        } else {
            converger.converge(&doc.network, &graph).await?
        };

        info!(
            applied = summary.applied.len(),
            skipped = summary.skipped.len(),
            "run complete"
        );
        Ok(())
    }
}
