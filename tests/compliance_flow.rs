//! End-to-end walk through the compliance engine and the portal token
//! window, entirely in memory: registry resolution, the document review
//! lifecycle as it affects aggregation, and expiry as a read-time
//! derivation.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use vendorserver::compliance::{
    effective_status, required_document_types, rollup_percentage, vendor_compliance,
};
use vendorserver::shared::models::{DocumentStatus, DocumentType, VendorDocument};
use vendorserver::vendors::new_portal_token;

fn registry() -> Vec<DocumentType> {
    let entries: [(&str, &[&str], bool); 4] = [
        (
            "ISO 9001 Certification",
            &["Packaging", "Raw Material", "Component Supplier"],
            true,
        ),
        ("Insurance Certificate", &["Logistics", "Services"], true),
        ("Carrier License", &["Logistics"], true),
        (
            "Environmental Compliance",
            &["Packaging", "Raw Material"],
            false,
        ),
    ];

    entries
        .into_iter()
        .map(|(name, categories, is_required)| DocumentType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            applicable_categories: categories.iter().map(|c| c.to_string()).collect(),
            is_required,
            expiry_required: true,
            default_validity_days: Some(365),
            created_at: Utc::now(),
        })
        .collect()
}

fn document(
    document_type_id: Uuid,
    status: DocumentStatus,
    expiry_date: Option<DateTime<Utc>>,
) -> VendorDocument {
    let now = Utc::now();
    VendorDocument {
        id: Uuid::new_v4(),
        vendor_id: Uuid::new_v4(),
        document_type_id,
        status: status.to_string(),
        file_name: Some("evidence.pdf".to_string()),
        file_path: Some("uploads/evidence.pdf".to_string()),
        file_size: Some(2048),
        issue_date: Some(now - Duration::days(1)),
        expiry_date,
        uploaded_by: None,
        uploaded_at: Some(now),
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn packaging_vendor_walks_from_zero_to_compliant_and_back() {
    let now = Utc::now();
    let types = registry();

    let required = required_document_types("Packaging", &types);
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].name, "ISO 9001 Certification");
    let iso_id = required[0].id;

    // Nothing uploaded yet.
    let result = vendor_compliance(&required, &[], now);
    assert_eq!(result.approved_count, 0);
    assert_eq!(result.total_required, 1);
    assert_eq!(result.percentage, 0);

    // Uploaded, awaiting review: still not compliant.
    let pending = vec![document(iso_id, DocumentStatus::Pending, None)];
    assert_eq!(vendor_compliance(&required, &pending, now).percentage, 0);

    // Approved with a year of validity: fully compliant.
    let approved = vec![document(
        iso_id,
        DocumentStatus::Approved,
        Some(now + Duration::days(365)),
    )];
    let result = vendor_compliance(&required, &approved, now);
    assert_eq!(result.approved_count, 1);
    assert_eq!(result.percentage, 100);

    // A year and a day later the same row reads expired and compliance
    // falls back to zero without any write.
    let later = now + Duration::days(366);
    assert_eq!(
        effective_status(&approved[0], later),
        DocumentStatus::Expired
    );
    assert_eq!(approved[0].status, "approved");
    assert_eq!(vendor_compliance(&required, &approved, later).percentage, 0);
}

#[test]
fn logistics_vendor_with_partial_coverage() {
    let now = Utc::now();
    let types = registry();

    let required = required_document_types("Logistics", &types);
    assert_eq!(required.len(), 2);

    let insurance = required
        .iter()
        .find(|t| t.name == "Insurance Certificate")
        .unwrap();

    let docs = vec![document(
        insurance.id,
        DocumentStatus::Approved,
        Some(now + Duration::days(200)),
    )];
    let result = vendor_compliance(&required, &docs, now);
    assert_eq!(result.approved_count, 1);
    assert_eq!(result.total_required, 2);
    assert_eq!(result.percentage, 50);
}

#[test]
fn optional_types_never_move_the_needle() {
    let now = Utc::now();
    let types = registry();
    let environmental = types
        .iter()
        .find(|t| t.name == "Environmental Compliance")
        .unwrap();

    let required = required_document_types("Packaging", &types);
    assert!(required.iter().all(|t| t.name != "Environmental Compliance"));

    // An approved optional document does not lift a vendor missing its
    // required evidence.
    let docs = vec![document(
        environmental.id,
        DocumentStatus::Approved,
        Some(now + Duration::days(100)),
    )];
    assert_eq!(vendor_compliance(&required, &docs, now).percentage, 0);
}

#[test]
fn category_without_requirements_is_fully_compliant() {
    let now = Utc::now();
    let types = registry();

    let required = required_document_types("Software", &types);
    assert!(required.is_empty());

    let result = vendor_compliance(&required, &[], now);
    assert_eq!(result.total_required, 0);
    assert_eq!(result.percentage, 100);
}

#[test]
fn rollups_average_vendor_percentages() {
    assert_eq!(rollup_percentage(&[100, 50]), 75);
    assert_eq!(rollup_percentage(&[0, 100, 100]), 67);
    // A category with no active vendors reports nothing out of compliance.
    assert_eq!(rollup_percentage(&[]), 100);
}

#[test]
fn portal_token_window_brackets_expiry() {
    let issued_at = Utc::now();
    let (token, expiry) = new_portal_token(issued_at, 30);
    assert!(!token.is_empty());

    // The resolve query treats a token as live while expiry >= now.
    let at_29_days = issued_at + Duration::days(29);
    let at_31_days = issued_at + Duration::days(31);
    assert!(expiry >= at_29_days);
    assert!(expiry < at_31_days);

    // Reissuing produces a different credential.
    let (reissued, _) = new_portal_token(issued_at, 30);
    assert_ne!(token, reissued);
}
