use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan_catalog::PlanRepo,
    domain::entities::plan::Plan,
};

fn row_to_plan(row: sqlx::postgres::PgRow) -> Plan {
    Plan {
        id: row.get("id"),
        display_name: row.get("display_name"),
        unit_price: row.get("unit_price"),
        credit_grant: row.get("credit_grant"),
        classification: row.get("classification"),
        validity_months: row.get("validity_months"),
        is_active: row.get("is_active"),
    }
}

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn list_all(&self) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(
            r#"
            SELECT id, display_name, unit_price, credit_grant, classification,
                   validity_months, is_active
            FROM plans
            ORDER BY display_order, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_plan).collect())
    }
}
