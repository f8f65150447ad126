use serde::Serialize;

use super::{LimitValue, PlanTier};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanLimits {
    pub users: LimitValue,
    pub vendors: LimitValue,
    pub documents: LimitValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanConfig {
    pub tier: PlanTier,
    pub name: &'static str,
    pub limits: PlanLimits,
}

pub fn plan_config(tier: PlanTier) -> PlanConfig {
    match tier {
        PlanTier::Free => PlanConfig {
            tier,
            name: "Free",
            limits: PlanLimits {
                users: LimitValue::Limited(3),
                vendors: LimitValue::Limited(10),
                documents: LimitValue::Limited(50),
            },
        },
        PlanTier::Pro => PlanConfig {
            tier,
            name: "Pro",
            limits: PlanLimits {
                users: LimitValue::Limited(10),
                vendors: LimitValue::Limited(100),
                documents: LimitValue::Limited(1000),
            },
        },
        PlanTier::ProPlus => PlanConfig {
            tier,
            name: "Pro Plus",
            limits: PlanLimits {
                users: LimitValue::Unlimited,
                vendors: LimitValue::Unlimited,
                documents: LimitValue::Unlimited,
            },
        },
    }
}

pub fn all_plans() -> Vec<PlanConfig> {
    vec![
        plan_config(PlanTier::Free),
        plan_config(PlanTier::Pro),
        plan_config(PlanTier::ProPlus),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_plan_ceilings() {
        let limits = plan_config(PlanTier::Free).limits;
        assert!(limits.vendors.allows(9));
        assert!(!limits.vendors.allows(10));
        assert!(!limits.users.allows(3));
        assert!(!limits.documents.allows(50));
    }

    #[test]
    fn test_pro_plus_is_unlimited() {
        let limits = plan_config(PlanTier::ProPlus).limits;
        assert!(limits.users.allows(i64::MAX - 1));
        assert!(limits.vendors.allows(1_000_000));
        assert!(limits.documents.allows(1_000_000));
    }

    #[test]
    fn test_all_plans_order() {
        let plans = all_plans();
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].tier, PlanTier::Free);
        assert_eq!(plans[2].tier, PlanTier::ProPlus);
    }

    #[test]
    fn test_plan_serialization_uses_minus_one() {
        let json = serde_json::to_value(plan_config(PlanTier::ProPlus)).unwrap();
        assert_eq!(json["limits"]["vendors"], serde_json::json!(-1));
        let json = serde_json::to_value(plan_config(PlanTier::Free)).unwrap();
        assert_eq!(json["limits"]["vendors"], serde_json::json!(10));
    }
}
