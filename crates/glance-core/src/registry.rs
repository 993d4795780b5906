//! In-memory registry of enrolled identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Embedding;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnrollError {
    #[error("display name must not be empty")]
    EmptyName,
    #[error("reference embedding must not be empty")]
    EmptyEmbedding,
}

/// Whether an enroll call created a new identity or merged into an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Created,
    Merged,
}

/// An enrolled person: stable id, display name, and one or more
/// reference embeddings. Holds at least one embedding from the moment
/// it is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: u32,
    pub name: String,
    pub embeddings: Vec<Embedding>,
    pub enrolled_at: DateTime<Utc>,
}

/// Registry of enrolled identities, keyed strictly by id.
///
/// Insertion order is preserved: matching iterates in enrollment order,
/// so exact score ties resolve to the earliest-enrolled identity.
/// Identity data lives in memory only, for the process lifetime.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    identities: Vec<Identity>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a new identity, or append a reference embedding to an
    /// existing one (refreshing its metadata timestamp).
    ///
    /// Never removes or replaces stored embeddings; duplicate embeddings
    /// are accepted as-is. Rejects empty input without mutating anything.
    pub fn enroll(
        &mut self,
        name: &str,
        id: u32,
        embedding: Embedding,
    ) -> Result<EnrollOutcome, EnrollError> {
        if name.trim().is_empty() {
            return Err(EnrollError::EmptyName);
        }
        if embedding.is_empty() {
            return Err(EnrollError::EmptyEmbedding);
        }

        match self.identities.iter_mut().find(|i| i.id == id) {
            Some(existing) => {
                existing.embeddings.push(embedding);
                existing.enrolled_at = Utc::now();
                tracing::info!(
                    identity_id = id,
                    references = existing.embeddings.len(),
                    "merged reference embedding into existing identity"
                );
                Ok(EnrollOutcome::Merged)
            }
            None => {
                self.identities.push(Identity {
                    id,
                    name: name.to_string(),
                    embeddings: vec![embedding],
                    enrolled_at: Utc::now(),
                });
                tracing::info!(identity_id = id, name, "enrolled new identity");
                Ok(EnrollOutcome::Created)
            }
        }
    }

    /// Look up an identity by id. Absent = no match, never an error.
    pub fn get(&self, id: u32) -> Option<&Identity> {
        self.identities.iter().find(|i| i.id == id)
    }

    /// Iterate identities in enrollment order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
