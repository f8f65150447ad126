//! Plan tiers and per-organization usage ceilings.
//!
//! Checkout and webhook traffic belong to the external payment processor;
//! this module only knows the tier stored on the organization row and the
//! hard ceilings each tier buys. Creation handlers call the `can_add_*`
//! gates before touching the store, keeping the compliance core free of
//! billing concerns.

pub mod plans;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::shared::models::Organization;
use crate::shared::schema::{organizations, users, vendor_documents, vendors};
use crate::shared::state::AppState;
use self::plans::{plan_config, PlanConfig, PlanLimits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Pro,
    ProPlus,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::ProPlus => "pro_plus",
        }
    }

    pub fn limits(&self) -> PlanLimits {
        plan_config(*self).limits
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlanTier {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            "pro_plus" => Ok(Self::ProPlus),
            _ => Err(format!("Unknown plan tier: {}", s)),
        }
    }
}

/// Usage ceiling for one metric. Serialized as the raw ceiling with `-1`
/// standing for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitValue {
    Limited(i64),
    Unlimited,
}

impl LimitValue {
    pub fn from_ceiling(ceiling: i64) -> Self {
        if ceiling < 0 {
            Self::Unlimited
        } else {
            Self::Limited(ceiling)
        }
    }

    pub fn ceiling(&self) -> i64 {
        match self {
            Self::Limited(v) => *v,
            Self::Unlimited => -1,
        }
    }

    pub fn allows(&self, current: i64) -> bool {
        match self {
            Self::Limited(limit) => current < *limit,
            Self::Unlimited => true,
        }
    }
}

impl Serialize for LimitValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.ceiling())
    }
}

impl<'de> Deserialize<'de> for LimitValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ceiling = i64::deserialize(deserializer)?;
        Ok(Self::from_ceiling(ceiling))
    }
}

/// The single tenant organization every user and vendor belongs to,
/// created by bootstrap.
pub fn default_org(conn: &mut PgConnection) -> Result<Organization, ApiError> {
    organizations::table
        .order(organizations::created_at.asc())
        .first::<Organization>(conn)
        .optional()?
        .ok_or(ApiError::NotFound("Organization"))
}

pub fn org_plan_tier(org: &Organization) -> PlanTier {
    org.plan_tier.parse().unwrap_or(PlanTier::Free)
}

fn count_users(conn: &mut PgConnection, org_id: Uuid) -> Result<i64, ApiError> {
    Ok(users::table
        .filter(users::org_id.eq(org_id))
        .count()
        .get_result(conn)?)
}

fn count_vendors(conn: &mut PgConnection, org_id: Uuid) -> Result<i64, ApiError> {
    Ok(vendors::table
        .filter(vendors::org_id.eq(org_id))
        .count()
        .get_result(conn)?)
}

fn count_documents(conn: &mut PgConnection, org_id: Uuid) -> Result<i64, ApiError> {
    Ok(vendor_documents::table
        .inner_join(vendors::table)
        .filter(vendors::org_id.eq(org_id))
        .count()
        .get_result(conn)?)
}

pub fn can_add_user(conn: &mut PgConnection, org: &Organization) -> Result<(), ApiError> {
    let current = count_users(conn, org.id)?;
    let limit = org_plan_tier(org).limits().users;
    if limit.allows(current) {
        Ok(())
    } else {
        Err(ApiError::QuotaExceeded(format!(
            "User limit reached for the {} plan",
            org.plan_tier
        )))
    }
}

pub fn can_add_vendor(conn: &mut PgConnection, org: &Organization) -> Result<(), ApiError> {
    let current = count_vendors(conn, org.id)?;
    let limit = org_plan_tier(org).limits().vendors;
    if limit.allows(current) {
        Ok(())
    } else {
        Err(ApiError::QuotaExceeded(format!(
            "Vendor limit reached for the {} plan",
            org.plan_tier
        )))
    }
}

pub fn can_add_document(conn: &mut PgConnection, org: &Organization) -> Result<(), ApiError> {
    let current = count_documents(conn, org.id)?;
    let limit = org_plan_tier(org).limits().documents;
    if limit.allows(current) {
        Ok(())
    } else {
        Err(ApiError::QuotaExceeded(format!(
            "Document limit reached for the {} plan",
            org.plan_tier
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct MetricUsage {
    pub used: i64,
    pub limit: LimitValue,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub plan_tier: PlanTier,
    pub users: MetricUsage,
    pub vendors: MetricUsage,
    pub documents: MetricUsage,
}

pub async fn get_organization(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Organization>, ApiError> {
    let mut conn = state.conn.get()?;
    let org = default_org(&mut conn)?;
    Ok(Json(org))
}

pub async fn list_plans() -> Json<Vec<PlanConfig>> {
    Json(plans::all_plans())
}

pub async fn get_usage(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UsageResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let org = default_org(&mut conn)?;
    let tier = org_plan_tier(&org);
    let limits = tier.limits();

    Ok(Json(UsageResponse {
        plan_tier: tier,
        users: MetricUsage {
            used: count_users(&mut conn, org.id)?,
            limit: limits.users,
        },
        vendors: MetricUsage {
            used: count_vendors(&mut conn, org.id)?,
            limit: limits.vendors,
        },
        documents: MetricUsage {
            used: count_documents(&mut conn, org.id)?,
            limit: limits.documents,
        },
    }))
}

pub fn configure_billing_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/billing/organization", get(get_organization))
        .route("/api/billing/plans", get(list_plans))
        .route("/api/billing/usage", get(get_usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_tier_round_trip() {
        for tier in [PlanTier::Free, PlanTier::Pro, PlanTier::ProPlus] {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);

            let serialized = serde_json::to_string(&tier).unwrap();
            let deserialized: PlanTier = serde_json::from_str(&serialized).unwrap();
            assert_eq!(deserialized, tier);
        }
        assert!("enterprise".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_limit_value_allows() {
        assert!(LimitValue::Limited(3).allows(2));
        assert!(!LimitValue::Limited(3).allows(3));
        assert!(!LimitValue::Limited(0).allows(0));
        assert!(LimitValue::Unlimited.allows(1_000_000));
    }

    #[test]
    fn test_limit_value_minus_one_is_unlimited() {
        assert_eq!(LimitValue::from_ceiling(-1), LimitValue::Unlimited);
        assert_eq!(LimitValue::from_ceiling(10), LimitValue::Limited(10));
        assert_eq!(LimitValue::Unlimited.ceiling(), -1);

        let serialized = serde_json::to_string(&LimitValue::Unlimited).unwrap();
        assert_eq!(serialized, "-1");
        let parsed: LimitValue = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, LimitValue::Unlimited);
        let parsed: LimitValue = serde_json::from_str("50").unwrap();
        assert_eq!(parsed, LimitValue::Limited(50));
    }
}
