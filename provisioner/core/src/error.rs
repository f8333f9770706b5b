use thiserror::Error;

/// An error that aborts a convergence run.
///
/// Every variant is unrecoverable at the point of occurrence: the run stops,
/// entities converged so far are left as-is, and the failing entity is named
/// so an operator knows where to intervene.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The site description cannot produce a provisionable plan.
    #[error("invalid configuration for {entity}: {reason}")]
    Configuration { entity: String, reason: String },

    /// An entity references a prerequisite that has not been converged.
    #[error("{entity} requires {missing}, which is not ready")]
    Dependency { entity: String, missing: String },

    /// Two entities claim the same exclusive resource.
    #[error("{entity} conflicts with {holder}: {reason}")]
    Conflict {
        entity: String,
        holder: String,
        reason: String,
    },
}

// === impl Error ===

impl Error {
    pub fn configuration(entity: impl ToString, reason: impl ToString) -> Self {
        Self::Configuration {
            entity: entity.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn dependency(entity: impl ToString, missing: impl ToString) -> Self {
        Self::Dependency {
            entity: entity.to_string(),
            missing: missing.to_string(),
        }
    }

    pub fn conflict(
        entity: impl ToString,
        holder: impl ToString,
        reason: impl ToString,
    ) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
            holder: holder.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The entity the run aborted on.
    pub fn entity(&self) -> &str {
        match self {
            Self::Configuration { entity, .. } => entity,
            Self::Dependency { entity, .. } => entity,
            Self::Conflict { entity, .. } => entity,
        }
    }
}
