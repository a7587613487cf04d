use std::sync::Arc;
use tracing::instrument;

use crate::data::ClientStateStore;
use crate::error::AppError;
use crate::identity::{self, SessionToken};
use crate::rank::{RollOutcome, Sampler, UniformSource};

/// What one roll request produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RollResult {
    pub outcome: RollOutcome,
    pub token: SessionToken,
    /// Set only when this request minted the client's identity.
    pub issued: bool,
}

/// Identify, create on first contact, sample, then commit through the cooldown gate.
pub struct RollService {
    store: Arc<ClientStateStore>,
    sampler: Sampler,
    source: Arc<dyn UniformSource>,
}

impl RollService {
    pub fn new(store: Arc<ClientStateStore>, sampler: Sampler, source: Arc<dyn UniformSource>) -> Self {
        Self { store, sampler, source }
    }

    pub fn store(&self) -> &ClientStateStore {
        &self.store
    }

    #[instrument(skip(self))]
    pub async fn roll(&self, cookie: Option<&str>) -> Result<RollResult, AppError> {
        let (token, issued) = identity::resolve(&self.store, cookie).await?;
        if issued {
            self.store.create(&token).await?;
        }

        // Sampled even when the cooldown will throw it away.
        let candidate = self.sampler.sample(self.source.as_ref());
        let outcome = self.store.read_modify_write(&token, candidate).await?;

        match outcome {
            RollOutcome::Accepted(rank) => tracing::info!(token = %token, rank = %rank, "Roll accepted"),
            RollOutcome::CooldownRejected => tracing::info!(token = %token, "Roll rejected by cooldown"),
            RollOutcome::CorruptRecord => tracing::warn!(token = %token, "Roll rejected, client record is corrupt"),
        }

        Ok(RollResult { outcome, token, issued })
    }
}
