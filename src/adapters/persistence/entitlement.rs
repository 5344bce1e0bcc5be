use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::fulfillment::{CommitOutcome, EntitlementRepo},
    domain::entities::{
        entitlement::{AccountEntitlement, BillingCycle, SubscriptionStatus},
        fulfillment::{FulfillmentOrigin, IdempotencyRecord},
    },
};

#[derive(sqlx::FromRow, Debug)]
struct EntitlementRow {
    account_id: Uuid,
    plan_id: Option<String>,
    billing_cycle: Option<BillingCycle>,
    subscription_status: SubscriptionStatus,
    credit_balance: i64,
    version: i64,
}

impl From<EntitlementRow> for AccountEntitlement {
    fn from(row: EntitlementRow) -> Self {
        AccountEntitlement {
            account_id: row.account_id,
            plan_id: row.plan_id,
            billing_cycle: row.billing_cycle,
            subscription_status: row.subscription_status,
            credit_balance: row.credit_balance,
            version: row.version,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct RecordRow {
    source_id: String,
    account_id: Uuid,
    origin: FulfillmentOrigin,
    applied_at: DateTime<Utc>,
    resulting_version: i64,
    result: Json<AccountEntitlement>,
}

impl From<RecordRow> for IdempotencyRecord {
    fn from(row: RecordRow) -> Self {
        IdempotencyRecord {
            source_id: row.source_id,
            account_id: row.account_id,
            origin: row.origin,
            applied_at: row.applied_at,
            resulting_version: row.resulting_version,
            result: row.result.0,
        }
    }
}

#[async_trait]
impl EntitlementRepo for PostgresPersistence {
    async fn get(&self, account_id: Uuid) -> AppResult<Option<AccountEntitlement>> {
        let row = sqlx::query_as::<_, EntitlementRow>(
            r#"
            SELECT account_id, plan_id, billing_cycle, subscription_status, credit_balance, version
            FROM account_entitlements
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(AccountEntitlement::from))
    }

    async fn find_record(&self, source_id: &str) -> AppResult<Option<IdempotencyRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT source_id, account_id, origin, applied_at, resulting_version, result
            FROM fulfillment_records
            WHERE source_id = $1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(IdempotencyRecord::from))
    }

    async fn commit(
        &self,
        next: &AccountEntitlement,
        expected_version: i64,
        record: &IdempotencyRecord,
    ) -> AppResult<CommitOutcome> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let recorded = sqlx::query(
            r#"
            INSERT INTO fulfillment_records
                (source_id, account_id, origin, applied_at, resulting_version, result)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_id) DO NOTHING
            "#,
        )
        .bind(&record.source_id)
        .bind(record.account_id)
        .bind(record.origin)
        .bind(record.applied_at)
        .bind(record.resulting_version)
        .bind(Json(&record.result))
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        if recorded.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(CommitOutcome::AlreadyRecorded);
        }

        let written = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO account_entitlements
                    (account_id, plan_id, billing_cycle, subscription_status, credit_balance, version)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (account_id) DO NOTHING
                "#,
            )
            .bind(next.account_id)
            .bind(&next.plan_id)
            .bind(next.billing_cycle)
            .bind(next.subscription_status)
            .bind(next.credit_balance)
            .bind(next.version)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?
        } else {
            sqlx::query(
                r#"
                UPDATE account_entitlements
                SET plan_id = $2,
                    billing_cycle = $3,
                    subscription_status = $4,
                    credit_balance = $5,
                    version = $6,
                    updated_at = NOW()
                WHERE account_id = $1 AND version = $7
                "#,
            )
            .bind(next.account_id)
            .bind(&next.plan_id)
            .bind(next.billing_cycle)
            .bind(next.subscription_status)
            .bind(next.credit_balance)
            .bind(next.version)
            .bind(expected_version)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?
        };

        if written.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(CommitOutcome::VersionConflict);
        }

        tx.commit().await.map_err(AppError::from)?;
        Ok(CommitOutcome::Committed)
    }
}
