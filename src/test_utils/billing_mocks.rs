//! In-memory mock implementations for billing-related ports.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_provider::{
            CheckoutRequest, CheckoutResult, CheckoutSession, PaymentProviderPort,
        },
        use_cases::{
            fulfillment::{CommitOutcome, EntitlementRepo},
            plan_catalog::PlanRepo,
        },
    },
    domain::entities::{
        entitlement::AccountEntitlement, fulfillment::IdempotencyRecord, plan::Plan,
    },
};

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<Vec<Plan>>,
}

impl InMemoryPlanRepo {
    pub fn with_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: Mutex::new(plans),
        }
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn list_all(&self) -> AppResult<Vec<Plan>> {
        Ok(self.plans.lock().unwrap().clone())
    }
}

// ============================================================================
// InMemoryEntitlementRepo
// ============================================================================

#[derive(Default)]
struct EntitlementStore {
    entitlements: HashMap<Uuid, AccountEntitlement>,
    records: HashMap<String, IdempotencyRecord>,
    forced_conflicts: u32,
    commit_attempts: u32,
    stale_reads: u32,
    delay: Option<Duration>,
}

/// Entitlements and fulfillment records behind one lock, so `commit` is
/// all-or-nothing exactly like the Postgres transaction.
#[derive(Default)]
pub struct InMemoryEntitlementRepo {
    store: Mutex<EntitlementStore>,
}

impl InMemoryEntitlementRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entitlement(&self, entitlement: AccountEntitlement) {
        self.store
            .lock()
            .unwrap()
            .entitlements
            .insert(entitlement.account_id, entitlement);
    }

    /// Make the next `n` commits report a version conflict without writing.
    pub fn fail_next_commits(&self, n: u32) {
        self.store.lock().unwrap().forced_conflicts = n;
    }

    /// Make the next `n` entitlement reads miss, as if they ran before a
    /// concurrent write landed.
    pub fn serve_stale_reads(&self, n: u32) {
        self.store.lock().unwrap().stale_reads = n;
    }

    /// Delay every port call, to exercise store timeouts.
    pub fn set_delay(&self, delay: Duration) {
        self.store.lock().unwrap().delay = Some(delay);
    }

    async fn pause(&self) {
        let delay = self.store.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn entitlement(&self, account_id: Uuid) -> Option<AccountEntitlement> {
        self.store
            .lock()
            .unwrap()
            .entitlements
            .get(&account_id)
            .cloned()
    }

    pub fn record(&self, source_id: &str) -> Option<IdempotencyRecord> {
        self.store.lock().unwrap().records.get(source_id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.store.lock().unwrap().records.len()
    }

    pub fn commit_attempts(&self) -> u32 {
        self.store.lock().unwrap().commit_attempts
    }
}

#[async_trait]
impl EntitlementRepo for InMemoryEntitlementRepo {
    async fn get(&self, account_id: Uuid) -> AppResult<Option<AccountEntitlement>> {
        self.pause().await;
        let mut store = self.store.lock().unwrap();
        if store.stale_reads > 0 {
            store.stale_reads -= 1;
            return Ok(None);
        }
        Ok(store.entitlements.get(&account_id).cloned())
    }

    async fn find_record(&self, source_id: &str) -> AppResult<Option<IdempotencyRecord>> {
        self.pause().await;
        Ok(self.record(source_id))
    }

    async fn commit(
        &self,
        next: &AccountEntitlement,
        expected_version: i64,
        record: &IdempotencyRecord,
    ) -> AppResult<CommitOutcome> {
        self.pause().await;
        let mut store = self.store.lock().unwrap();
        store.commit_attempts += 1;

        if store.forced_conflicts > 0 {
            store.forced_conflicts -= 1;
            return Ok(CommitOutcome::VersionConflict);
        }
        if store.records.contains_key(&record.source_id) {
            return Ok(CommitOutcome::AlreadyRecorded);
        }
        let stored_version = store
            .entitlements
            .get(&next.account_id)
            .map(|e| e.version)
            .unwrap_or(0);
        if stored_version != expected_version {
            return Ok(CommitOutcome::VersionConflict);
        }

        store.entitlements.insert(next.account_id, next.clone());
        store
            .records
            .insert(record.source_id.clone(), record.clone());
        Ok(CommitOutcome::Committed)
    }
}

// ============================================================================
// FakePaymentProvider
// ============================================================================

/// Payment provider double: serves preset sessions and remembers checkouts.
#[derive(Default)]
pub struct FakePaymentProvider {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    checkouts: Mutex<Vec<CheckoutRequest>>,
    delay: Option<Duration>,
}

impl FakePaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: CheckoutSession) -> Self {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
        self
    }

    /// Answer every call only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProviderPort for FakePaymentProvider {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        self.pause().await;
        let mut checkouts = self.checkouts.lock().unwrap();
        checkouts.push(request.clone());
        let session_id = format!("cs_test_{}", checkouts.len());
        Ok(CheckoutResult {
            url: Some(format!("https://checkout.test/{}", session_id)),
            session_id,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
        self.pause().await;
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }
}
