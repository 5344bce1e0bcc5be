use async_trait::async_trait;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::{
        entities::{
            entitlement::AccountEntitlement,
            fulfillment::{FulfillmentEvent, IdempotencyRecord},
        },
        plan_catalog::PlanCatalog,
        reconciliation::{Reconciliation, reconcile},
    },
};

/// Read-compute-write attempts before giving up on a contended account.
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Result of a conditional write of one fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Entitlement and record were written together
    Committed,
    /// The entitlement moved past `expected_version`; nothing was written
    VersionConflict,
    /// A record for the source id already exists; nothing was written
    AlreadyRecorded,
}

#[async_trait]
pub trait EntitlementRepo: Send + Sync {
    async fn get(&self, account_id: Uuid) -> AppResult<Option<AccountEntitlement>>;

    async fn find_record(&self, source_id: &str) -> AppResult<Option<IdempotencyRecord>>;

    /// Atomically write `next` and `record`, only if the stored entitlement is
    /// still at `expected_version` (0 meaning "never persisted").
    async fn commit(
        &self,
        next: &AccountEntitlement,
        expected_version: i64,
        record: &IdempotencyRecord,
    ) -> AppResult<CommitOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "entitlement", rename_all = "snake_case")]
pub enum FulfillmentOutcome {
    Applied(AccountEntitlement),
    AlreadyApplied(AccountEntitlement),
}

impl FulfillmentOutcome {
    pub fn entitlement(&self) -> &AccountEntitlement {
        match self {
            FulfillmentOutcome::Applied(e) | FulfillmentOutcome::AlreadyApplied(e) => e,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, FulfillmentOutcome::AlreadyApplied(_))
    }
}

/// Idempotent, optimistically-locked application of fulfillment events.
#[derive(Clone)]
pub struct FulfillmentUseCases {
    repo: Arc<dyn EntitlementRepo>,
    catalog: Arc<PlanCatalog>,
    store_timeout: Duration,
}

impl FulfillmentUseCases {
    pub fn new(repo: Arc<dyn EntitlementRepo>, catalog: Arc<PlanCatalog>, store_timeout: Duration) -> Self {
        Self {
            repo,
            catalog,
            store_timeout,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Current entitlement; accounts never written read as freshly registered.
    pub async fn get_entitlement(&self, account_id: Uuid) -> AppResult<AccountEntitlement> {
        let found = tokio::time::timeout(self.store_timeout, self.repo.get(account_id))
            .await
            .map_err(|_| AppError::Timeout("entitlement store".into()))??;
        Ok(found.unwrap_or_else(|| AccountEntitlement::registered(account_id)))
    }

    /// Apply `event` exactly once.
    ///
    /// The whole bounded retry loop runs under the store timeout. Dropping an
    /// in-flight commit rolls its transaction back, so a timeout never leaves
    /// a partial write behind.
    #[instrument(skip(self, event), fields(source_id = %event.source_id, account_id = %event.account_id, origin = %event.origin))]
    pub async fn apply(&self, event: &FulfillmentEvent) -> AppResult<FulfillmentOutcome> {
        tokio::time::timeout(self.store_timeout, self.try_apply(event))
            .await
            .map_err(|_| AppError::Timeout("entitlement store".into()))?
    }

    async fn try_apply(&self, event: &FulfillmentEvent) -> AppResult<FulfillmentOutcome> {
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let prior = self.repo.find_record(&event.source_id).await?;
            if let Some(record) = &prior
                && record.account_id != event.account_id
            {
                tracing::warn!(
                    recorded_account = %record.account_id,
                    "Source id already applied to a different account"
                );
                return Err(AppError::Forbidden);
            }

            let current = self
                .repo
                .get(event.account_id)
                .await?
                .unwrap_or_else(|| AccountEntitlement::registered(event.account_id));

            let next = match reconcile(&current, event, prior.as_ref(), &self.catalog)? {
                Reconciliation::AlreadyApplied(stored) => {
                    tracing::info!(version = stored.version, "Fulfillment already applied");
                    return Ok(FulfillmentOutcome::AlreadyApplied(stored));
                }
                Reconciliation::Applied(next) => next,
            };

            let record = IdempotencyRecord::new(event, &next);
            match self.repo.commit(&next, current.version, &record).await? {
                CommitOutcome::Committed => {
                    tracing::info!(
                        version = next.version,
                        credit_balance = next.credit_balance,
                        previous_balance = current.credit_balance,
                        "Fulfillment applied"
                    );
                    return Ok(FulfillmentOutcome::Applied(next));
                }
                outcome => {
                    tracing::debug!(attempt, ?outcome, expected_version = current.version, "Commit lost race, retrying");
                }
            }
        }

        tracing::error!(attempts = MAX_COMMIT_ATTEMPTS, "Fulfillment retries exhausted");
        Err(AppError::PersistenceConflict)
    }
}
