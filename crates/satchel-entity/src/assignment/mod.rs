//! Assignments delivered by the sync layer.
//!
//! Lessons, exams and similar models imply that content should (or should
//! no longer) be on a device. The bridge turns these into requests.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use satchel_core::types::{ContentNodeId, DatasetId, TransferSessionId};

/// One node an assigning entity needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    /// Model name of the assigning entity (e.g., `lessons.lesson`).
    pub source_model: String,
    /// Identifier of the assigning entity.
    pub source_id: String,
    /// The assigned node.
    pub contentnode_id: ContentNodeId,
}

/// An assignment change that makes content unnecessary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovableAssignment {
    /// A single node was unassigned.
    Removed(Assignment),
    /// The assigning entity itself was deleted, so every node it ever
    /// requested is unneeded.
    Deleted {
        /// Model name of the deleted entity.
        source_model: String,
        /// Identifier of the deleted entity.
        source_id: String,
    },
}

impl RemovableAssignment {
    /// The source entity this change belongs to.
    pub fn source(&self) -> (&str, &str) {
        match self {
            Self::Removed(assignment) => (&assignment.source_model, &assignment.source_id),
            Self::Deleted {
                source_model,
                source_id,
            } => (source_model, source_id),
        }
    }
}

/// Which assignment changes to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentScope {
    /// Only changes received in one transfer session.
    TransferSession(TransferSessionId),
    /// Everything in the dataset.
    Dataset(DatasetId),
}
