use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::compliance;
use crate::documents;
use crate::error::ApiError;
use crate::shared::models::{DocumentStatus, DocumentType, RiskLevel, Vendor, VendorDocument, VendorStatus};
use crate::shared::schema::{document_types, vendor_documents, vendors};
use crate::shared::state::AppState;

#[derive(Debug, Serialize)]
pub struct ComplianceStats {
    pub overall_compliance: i64,
    pub vendors_at_risk: i64,
    pub expiring_this_month: i64,
    pub total_vendors: i64,
}

#[derive(Debug, Serialize)]
pub struct CategoryCompliance {
    pub category: String,
    pub percentage: i64,
    pub vendor_count: i64,
}

/// A vendor counts as at risk when its required documents are not fully
/// covered and it is high risk, or when coverage has fallen below half.
fn at_risk(risk_level: &str, percentage: i64) -> bool {
    let high = risk_level.parse::<RiskLevel>() == Ok(RiskLevel::High);
    (high && percentage < 100) || percentage < 50
}

/// First instant of the next calendar month.
fn month_end(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now + Duration::days(31))
}

/// Compliance percentage per active vendor, computed from one load of the
/// registry and one load of the vendors' documents.
fn active_vendor_percentages(
    conn: &mut PgConnection,
) -> Result<Vec<(Vendor, i64)>, ApiError> {
    let active: Vec<Vendor> = vendors::table
        .filter(vendors::status.eq(VendorStatus::Active.to_string()))
        .load(conn)?;
    if active.is_empty() {
        return Ok(Vec::new());
    }

    let types: Vec<DocumentType> = document_types::table.load(conn)?;

    let vendor_ids: Vec<Uuid> = active.iter().map(|v| v.id).collect();
    let docs: Vec<VendorDocument> = vendor_documents::table
        .filter(vendor_documents::vendor_id.eq_any(&vendor_ids))
        .load(conn)?;

    let mut by_vendor: HashMap<Uuid, Vec<VendorDocument>> = HashMap::new();
    for doc in docs {
        by_vendor.entry(doc.vendor_id).or_default().push(doc);
    }

    let now = Utc::now();
    let empty = Vec::new();
    Ok(active
        .into_iter()
        .map(|vendor| {
            let required = compliance::required_document_types(&vendor.category, &types);
            let vendor_docs = by_vendor.get(&vendor.id).unwrap_or(&empty);
            let result = compliance::vendor_compliance(&required, vendor_docs, now);
            (vendor, result.percentage)
        })
        .collect())
}

pub async fn get_compliance_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ComplianceStats>, ApiError> {
    let mut conn = state.conn.get()?;

    let per_vendor = active_vendor_percentages(&mut conn)?;
    let total_vendors = per_vendor.len() as i64;
    let percentages: Vec<i64> = per_vendor.iter().map(|(_, pct)| *pct).collect();
    let overall_compliance = compliance::rollup_percentage(&percentages);
    let vendors_at_risk = per_vendor
        .iter()
        .filter(|(vendor, pct)| at_risk(&vendor.risk_level, *pct))
        .count() as i64;

    let now = Utc::now();
    let expiring_this_month: i64 = vendor_documents::table
        .filter(vendor_documents::status.eq(DocumentStatus::Approved.to_string()))
        .filter(vendor_documents::expiry_date.ge(now))
        .filter(vendor_documents::expiry_date.lt(month_end(now)))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(ComplianceStats {
        overall_compliance,
        vendors_at_risk,
        expiring_this_month,
        total_vendors,
    }))
}

pub async fn get_compliance_by_category(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryCompliance>>, ApiError> {
    let mut conn = state.conn.get()?;

    let per_vendor = active_vendor_percentages(&mut conn)?;

    let mut by_category: HashMap<String, Vec<i64>> = HashMap::new();
    for (vendor, pct) in per_vendor {
        by_category.entry(vendor.category).or_default().push(pct);
    }

    let mut result: Vec<CategoryCompliance> = by_category
        .into_iter()
        .map(|(category, percentages)| CategoryCompliance {
            percentage: compliance::rollup_percentage(&percentages),
            vendor_count: percentages.len() as i64,
            category,
        })
        .collect();
    result.sort_by(|a, b| a.category.cmp(&b.category));

    Ok(Json(result))
}

pub fn configure_dashboards_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stats/compliance", get(get_compliance_stats))
        .route(
            "/api/stats/compliance-by-category",
            get(get_compliance_by_category),
        )
        .route(
            "/api/stats/expiring-documents",
            get(documents::list_expiring_documents),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_risk_rules() {
        assert!(at_risk("high", 99));
        assert!(!at_risk("high", 100));
        assert!(at_risk("low", 49));
        assert!(!at_risk("low", 50));
        assert!(!at_risk("medium", 75));
        assert!(at_risk("medium", 10));
    }

    #[test]
    fn test_month_end_rolls_over_december() {
        let now = Utc.with_ymd_and_hms(2025, 12, 14, 10, 0, 0).unwrap();
        let end = month_end(now);
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            month_end(now),
            Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
        );
    }
}
