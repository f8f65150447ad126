//! First-run setup: the default organization and the stock document-type
//! registry. Both steps are idempotent and run after migrations on every
//! start.

use anyhow::Result;
use chrono::Utc;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::shared::models::{DocumentType, Organization};
use crate::shared::schema::{document_types, organizations};
use crate::shared::utils::DbPool;

pub fn ensure_seed_data(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    ensure_default_organization(&mut conn)?;
    ensure_default_document_types(&mut conn)?;
    Ok(())
}

fn ensure_default_organization(conn: &mut PgConnection) -> Result<()> {
    let existing: i64 = organizations::table.count().get_result(conn)?;
    if existing > 0 {
        return Ok(());
    }

    let now = Utc::now();
    let org = Organization {
        id: Uuid::new_v4(),
        name: "Default Organization".to_string(),
        plan_tier: "free".to_string(),
        stripe_customer_id: None,
        stripe_subscription_id: None,
        subscription_status: "active".to_string(),
        current_period_end: None,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(organizations::table)
        .values(&org)
        .execute(conn)?;
    info!("created default organization {}", org.id);
    Ok(())
}

struct SeedType {
    name: &'static str,
    description: &'static str,
    categories: &'static [&'static str],
    is_required: bool,
    expiry_required: bool,
    default_validity_days: Option<i32>,
}

const SEED_TYPES: &[SeedType] = &[
    SeedType {
        name: "ISO 9001 Certification",
        description: "Quality management system certification",
        categories: &["Packaging", "Raw Material", "Component Supplier"],
        is_required: true,
        expiry_required: true,
        default_validity_days: Some(365),
    },
    SeedType {
        name: "Safety Data Sheet (SDS)",
        description: "Material safety data sheet",
        categories: &["Raw Material", "Component Supplier"],
        is_required: true,
        expiry_required: false,
        default_validity_days: None,
    },
    SeedType {
        name: "Insurance Certificate",
        description: "General liability insurance certificate",
        categories: &["Logistics", "Services"],
        is_required: true,
        expiry_required: true,
        default_validity_days: Some(365),
    },
    SeedType {
        name: "Environmental Compliance",
        description: "Environmental management certification",
        categories: &["Packaging", "Raw Material", "Component Supplier"],
        is_required: false,
        expiry_required: true,
        default_validity_days: Some(730),
    },
    SeedType {
        name: "Carrier License",
        description: "Commercial carrier license",
        categories: &["Logistics"],
        is_required: true,
        expiry_required: true,
        default_validity_days: Some(365),
    },
];

fn ensure_default_document_types(conn: &mut PgConnection) -> Result<()> {
    let existing: i64 = document_types::table.count().get_result(conn)?;
    if existing > 0 {
        return Ok(());
    }

    for seed in SEED_TYPES {
        let doc_type = DocumentType {
            id: Uuid::new_v4(),
            name: seed.name.to_string(),
            description: Some(seed.description.to_string()),
            applicable_categories: seed.categories.iter().map(|c| c.to_string()).collect(),
            is_required: seed.is_required,
            expiry_required: seed.expiry_required,
            default_validity_days: seed.default_validity_days,
            created_at: Utc::now(),
        };
        diesel::insert_into(document_types::table)
            .values(&doc_type)
            .execute(conn)?;
    }
    info!("seeded {} document types", SEED_TYPES.len());
    Ok(())
}
