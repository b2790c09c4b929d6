use flowgate_model::plan::{Plan, PlanName};

/// Read-only in-process view of the configured plans (the plan catalog
/// is the one piece of process-local state besides the resource snapshot).
#[derive(Clone, Debug)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    pub fn get(&self, name: PlanName) -> Option<&Plan> {
        self.plans.iter().find(|p| p.name == name)
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }
}

impl From<flowgate_config::Config> for PlanCatalog {
    fn from(config: flowgate_config::Config) -> Self {
        Self::new(config.plan_catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_every_builtin_plan() {
        let catalog = PlanCatalog::new(flowgate_config::default_plan_catalog());
        for name in [
            PlanName::Free,
            PlanName::Premium,
            PlanName::Pro,
            PlanName::Corporate,
        ] {
            assert!(catalog.get(name).is_some(), "missing plan {name}");
        }
    }
}
