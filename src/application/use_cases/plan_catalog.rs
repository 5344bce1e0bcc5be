use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    domain::{entities::plan::Plan, plan_catalog::PlanCatalog},
};

#[async_trait]
pub trait PlanRepo: Send + Sync {
    /// Every plan, active or retired.
    async fn list_all(&self) -> AppResult<Vec<Plan>>;
}

/// Load the catalog snapshot used for the lifetime of the process.
pub async fn load_plan_catalog(repo: &dyn PlanRepo) -> AppResult<PlanCatalog> {
    let plans = repo.list_all().await?;
    let catalog = PlanCatalog::new(plans);
    if catalog.is_empty() {
        tracing::warn!("Plan catalog is empty; every plan purchase will be rejected");
    } else {
        tracing::info!(plans = catalog.len(), "Loaded plan catalog");
    }
    Ok(catalog)
}
