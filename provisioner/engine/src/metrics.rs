use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct EntityLabels {
    kind: String,
    outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RunLabels {
    outcome: String,
}

/// Counters over convergence outcomes.
#[derive(Clone, Debug)]
pub struct ConvergeMetrics {
    entities: Family<EntityLabels, Counter>,
    runs: Family<RunLabels, Counter>,
}

// === impl ConvergeMetrics ===

impl ConvergeMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let entities = Family::default();
        prom.register(
            "entities",
            "Count of per-entity convergence outcomes",
            entities.clone(),
        );

        let runs = Family::default();
        prom.register("runs", "Count of convergence runs by outcome", runs.clone());

        Self { entities, runs }
    }

    pub(crate) fn entity(&self, kind: &str, outcome: &str) {
        self.entities
            .get_or_create(&EntityLabels {
                kind: kind.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub(crate) fn run(&self, outcome: &str) {
        self.runs
            .get_or_create(&RunLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }
}
