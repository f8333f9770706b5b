use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    hash::{BuildHasher, Hasher},
    path::PathBuf,
};
use vidsite_provisioner_core::Error;

// Fixed seeds keep fingerprints stable across processes.
const FINGERPRINT_SEEDS: (u64, u64, u64, u64) = (
    0x7669_6473_6974_6501,
    0x7072_6f76_6973_696f,
    0x6e65_7220_7374_6174,
    0x6520_6669_6e67_6572,
);

/// A converged entity as recorded in persisted state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Provider-assigned id.
    pub id: String,
    pub kind: String,

    /// Hash of the desired spec at convergence time. A changed fingerprint
    /// means the entity drifted from its description and is replaced.
    pub fingerprint: String,

    pub converged_at: DateTime<Utc>,
}

/// The last-applied resource graph, as persisted between runs.
///
/// Consulted before any convergence so an entity that already matches its
/// description is never created twice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceState {
    pub entities: BTreeMap<String, Record>,

    /// Which workload entity owns each target group. At most one.
    pub target_group_owners: BTreeMap<String, String>,
}

/// Loads and persists convergence state.
///
/// The state lives outside the process ("remote state"); a file-backed store
/// and an in-memory store ship in-tree, other backends implement the trait.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<ConvergenceState>;
    fn save(&self, state: &ConvergenceState) -> Result<()>;
}

/// JSON state at a filesystem path. A missing file is an empty state.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

/// State held in memory. Used by tests and plan preview.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<ConvergenceState>,
}

/// The process-wide handle over convergence state.
///
/// State is loaded once, before anything mutates, and written back through
/// the store after every recorded change.
pub struct StateHandle<S> {
    store: S,
    state: RwLock<ConvergenceState>,
}

/// A stable digest of a desired spec.
pub fn fingerprint<T: Serialize>(spec: &T) -> Result<String> {
    let bytes = serde_json::to_vec(spec).context("serializing spec for fingerprint")?;
    let (k0, k1, k2, k3) = FINGERPRINT_SEEDS;
    let mut hasher = ahash::RandomState::with_seeds(k0, k1, k2, k3).build_hasher();
    hasher.write(&bytes);
    Ok(format!("{:016x}", hasher.finish()))
}

impl<S: StateStore> StateStore for std::sync::Arc<S> {
    fn load(&self) -> Result<ConvergenceState> {
        (**self).load()
    }

    fn save(&self, state: &ConvergenceState) -> Result<()> {
        (**self).save(state)
    }
}

// === impl FileStore ===

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Result<ConvergenceState> {
        if !self.path.exists() {
            return Ok(ConvergenceState::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading state from {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state at {}", self.path.display()))
    }

    fn save(&self, state: &ConvergenceState) -> Result<()> {
        let raw = serde_json::to_string_pretty(state).context("serializing state")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing state to {}", self.path.display()))
    }
}

// === impl MemoryStore ===

impl StateStore for MemoryStore {
    fn load(&self) -> Result<ConvergenceState> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &ConvergenceState) -> Result<()> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}

// === impl StateHandle ===

impl<S: StateStore> StateHandle<S> {
    /// Loads persisted state. Nothing mutates before this happens.
    pub fn load(store: S) -> Result<Self> {
        let state = store.load()?;
        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    pub fn get(&self, name: &str) -> Option<Record> {
        self.state.read().entities.get(name).cloned()
    }

    pub fn snapshot(&self) -> ConvergenceState {
        self.state.read().clone()
    }

    pub fn record(&self, name: &str, record: Record) -> Result<()> {
        let mut state = self.state.write();
        state.entities.insert(name.to_string(), record);
        self.store.save(&state)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        state.entities.remove(name);
        self.store.save(&state)
    }

    /// Claims a target group for a workload entity.
    ///
    /// At most one workload attaches to a target group at a time; a claim
    /// held by anyone else is a conflict, resolved only by an explicit
    /// destroy of the holder.
    pub fn claim_target_group(&self, target_group: &str, owner: &str) -> Result<()> {
        let mut state = self.state.write();
        match state.target_group_owners.get(target_group) {
            Some(holder) if holder != owner => Err(Error::conflict(
                owner,
                holder,
                format!("target group {} already has an attached workload", target_group),
            )
            .into()),
            _ => {
                state
                    .target_group_owners
                    .insert(target_group.to_string(), owner.to_string());
                self.store.save(&state)
            }
        }
    }

    /// Releases every claim held by the given entity.
    pub fn release_claims_of(&self, owner: &str) -> Result<()> {
        let mut state = self.state.write();
        state.target_group_owners.retain(|_, holder| holder != owner);
        self.store.save(&state)
    }
}
