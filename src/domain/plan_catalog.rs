use std::collections::HashMap;

use super::entities::plan::Plan;

/// Read-only snapshot of the plan table.
///
/// Seeded out-of-band and loaded once at startup. Lookups include inactive
/// plans so that purchases started before a plan was retired still fulfill.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    plans: HashMap<String, Plan>,
}

impl PlanCatalog {
    pub fn new(plans: impl IntoIterator<Item = Plan>) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn lookup(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.get(plan_id)
    }

    /// Plans open for new purchases, cheapest first.
    pub fn active(&self) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = self.plans.values().filter(|p| p.is_active).collect();
        plans.sort_by(|a, b| a.unit_price.cmp(&b.unit_price).then(a.id.cmp(&b.id)));
        plans
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
