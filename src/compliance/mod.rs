//! Compliance evaluation engine.
//!
//! Pure functions over document types, vendor documents, and a caller
//! supplied clock. Nothing here touches the store: handlers load the rows
//! and pass them in. Expiry is derived at read time from
//! `(status, expiry_date, now)` and never written back.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::shared::models::{DocumentStatus, DocumentType, VendorDocument};

/// Filters the registry down to the document types a vendor of the given
/// category must satisfy. Optional types never appear here.
pub fn required_document_types<'a>(
    category: &str,
    types: &'a [DocumentType],
) -> Vec<&'a DocumentType> {
    types
        .iter()
        .filter(|t| t.is_required && t.applicable_categories.iter().any(|c| c == category))
        .collect()
}

/// Status of a document as observed now. A stored `approved` row whose
/// expiry date has passed reads as `expired`; the row itself is never
/// rewritten.
pub fn effective_status(document: &VendorDocument, now: DateTime<Utc>) -> DocumentStatus {
    let stored = document
        .status
        .parse::<DocumentStatus>()
        .unwrap_or(DocumentStatus::Pending);

    match (stored, document.expiry_date) {
        (DocumentStatus::Approved, Some(expiry)) if expiry < now => DocumentStatus::Expired,
        _ => stored,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VendorCompliance {
    pub approved_count: i64,
    pub total_required: i64,
    pub percentage: i64,
}

/// Compliance of one vendor against its required document types. A vendor
/// with no requirements is 100% compliant by convention.
pub fn vendor_compliance(
    required: &[&DocumentType],
    documents: &[VendorDocument],
    now: DateTime<Utc>,
) -> VendorCompliance {
    let total_required = required.len() as i64;

    let approved_count = required
        .iter()
        .filter(|doc_type| {
            documents
                .iter()
                .find(|d| d.document_type_id == doc_type.id)
                .map(|d| effective_status(d, now) == DocumentStatus::Approved)
                .unwrap_or(false)
        })
        .count() as i64;

    VendorCompliance {
        approved_count,
        total_required,
        percentage: percentage_of(approved_count, total_required),
    }
}

fn percentage_of(approved: i64, total: i64) -> i64 {
    if total == 0 {
        return 100;
    }
    (100.0 * approved as f64 / total as f64).round() as i64
}

/// Round-half-up mean of per-vendor percentages, used for category and
/// organization rollups. No vendors means nothing out of compliance.
pub fn rollup_percentage(percentages: &[i64]) -> i64 {
    if percentages.is_empty() {
        return 100;
    }
    let sum: i64 = percentages.iter().sum();
    (sum as f64 / percentages.len() as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn doc_type(name: &str, categories: &[&str], is_required: bool) -> DocumentType {
        DocumentType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            applicable_categories: categories.iter().map(|c| c.to_string()).collect(),
            is_required,
            expiry_required: true,
            default_validity_days: Some(365),
            created_at: Utc::now(),
        }
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
            file_name: Some("certificate.pdf".to_string()),
            file_path: Some("uploads/certificate.pdf".to_string()),
            file_size: Some(1024),
            issue_date: None,
            expiry_date,
            uploaded_by: Some(Uuid::new_v4()),
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
    fn test_resolver_filters_by_category() {
        let types = vec![
            doc_type("ISO 9001", &["Packaging"], true),
            doc_type("Carrier License", &["Logistics"], true),
        ];

        let required = required_document_types("Packaging", &types);
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].name, "ISO 9001");
    }

    #[test]
    fn test_resolver_excludes_optional_types() {
        let types = vec![
            doc_type("ISO 9001", &["Packaging"], true),
            doc_type("Environmental Compliance", &["Packaging"], false),
        ];

        let required = required_document_types("Packaging", &types);
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].name, "ISO 9001");
    }

    #[test]
    fn test_resolver_empty_when_nothing_matches() {
        let types = vec![doc_type("ISO 9001", &["Packaging"], true)];
        assert!(required_document_types("Logistics", &types).is_empty());
    }

    #[test]
    fn test_effective_status_passes_stored_through() {
        let now = Utc::now();
        let doc = document(Uuid::new_v4(), DocumentStatus::Pending, None);
        assert_eq!(effective_status(&doc, now), DocumentStatus::Pending);

        let doc = document(Uuid::new_v4(), DocumentStatus::Rejected, None);
        assert_eq!(effective_status(&doc, now), DocumentStatus::Rejected);
    }

    #[test]
    fn test_effective_status_expires_approved_documents() {
        let now = Utc::now();
        let doc = document(
            Uuid::new_v4(),
            DocumentStatus::Approved,
            Some(now - Duration::days(1)),
        );
        assert_eq!(effective_status(&doc, now), DocumentStatus::Expired);

        // Long past the expiry the answer stays the same.
        let doc = document(
            Uuid::new_v4(),
            DocumentStatus::Approved,
            Some(now - Duration::days(900)),
        );
        assert_eq!(effective_status(&doc, now), DocumentStatus::Expired);
    }

    #[test]
    fn test_effective_status_keeps_current_approvals() {
        let now = Utc::now();
        let doc = document(
            Uuid::new_v4(),
            DocumentStatus::Approved,
            Some(now + Duration::days(30)),
        );
        assert_eq!(effective_status(&doc, now), DocumentStatus::Approved);

        let doc = document(Uuid::new_v4(), DocumentStatus::Approved, None);
        assert_eq!(effective_status(&doc, now), DocumentStatus::Approved);
    }

    #[test]
    fn test_effective_status_does_not_expire_pending() {
        let now = Utc::now();
        let doc = document(
            Uuid::new_v4(),
            DocumentStatus::Pending,
            Some(now - Duration::days(1)),
        );
        assert_eq!(effective_status(&doc, now), DocumentStatus::Pending);
    }

    #[test]
    fn test_effective_status_is_idempotent() {
        let now = Utc::now();
        let doc = document(
            Uuid::new_v4(),
            DocumentStatus::Approved,
            Some(now - Duration::days(5)),
        );
        let first = effective_status(&doc, now);
        let second = effective_status(&doc, now);
        assert_eq!(first, second);
        assert_eq!(doc.status, "approved");
    }

    #[test]
    fn test_compliance_zero_requirements_is_fully_compliant() {
        let now = Utc::now();
        let result = vendor_compliance(&[], &[], now);
        assert_eq!(result.total_required, 0);
        assert_eq!(result.approved_count, 0);
        assert_eq!(result.percentage, 100);
    }

    #[test]
    fn test_compliance_missing_required_document() {
        let now = Utc::now();
        let iso = doc_type("ISO 9001", &["Packaging"], true);
        let types = vec![iso];
        let required = required_document_types("Packaging", &types);

        let result = vendor_compliance(&required, &[], now);
        assert_eq!(result.approved_count, 0);
        assert_eq!(result.total_required, 1);
        assert_eq!(result.percentage, 0);
    }

    #[test]
    fn test_compliance_counts_only_effectively_approved() {
        let now = Utc::now();
        let types = vec![
            doc_type("ISO 9001", &["Packaging"], true),
            doc_type("Insurance Certificate", &["Packaging"], true),
        ];
        let required = required_document_types("Packaging", &types);

        let docs = vec![
            document(
                types[0].id,
                DocumentStatus::Approved,
                Some(now + chrono::Duration::days(10)),
            ),
            // Approved on the row, but past expiry: reads expired, not approved.
            document(
                types[1].id,
                DocumentStatus::Approved,
                Some(now - chrono::Duration::days(10)),
            ),
        ];

        let result = vendor_compliance(&required, &docs, now);
        assert_eq!(result.approved_count, 1);
        assert_eq!(result.total_required, 2);
        assert_eq!(result.percentage, 50);
    }

    #[test]
    fn test_compliance_pending_does_not_count() {
        let now = Utc::now();
        let types = vec![doc_type("ISO 9001", &["Packaging"], true)];
        let required = required_document_types("Packaging", &types);

        let docs = vec![document(types[0].id, DocumentStatus::Pending, None)];
        let result = vendor_compliance(&required, &docs, now);
        assert_eq!(result.approved_count, 0);
        assert_eq!(result.percentage, 0);
    }

    #[test]
    fn test_compliance_approved_optional_does_not_raise_percentage() {
        let now = Utc::now();
        let optional = doc_type("Environmental Compliance", &["Packaging"], false);
        let required_type = doc_type("ISO 9001", &["Packaging"], true);
        let types = vec![optional, required_type];
        let required = required_document_types("Packaging", &types);
        assert_eq!(required.len(), 1);

        // Only the optional type has an approved document.
        let docs = vec![document(types[0].id, DocumentStatus::Approved, None)];
        let result = vendor_compliance(&required, &docs, now);
        assert_eq!(result.total_required, 1);
        assert_eq!(result.approved_count, 0);
        assert_eq!(result.percentage, 0);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(1, 2), 50);
        assert_eq!(percentage_of(1, 8), 13);
        assert_eq!(percentage_of(0, 7), 0);
        assert_eq!(percentage_of(7, 7), 100);
    }

    #[test]
    fn test_rollup_percentage() {
        assert_eq!(rollup_percentage(&[]), 100);
        assert_eq!(rollup_percentage(&[100, 0]), 50);
        assert_eq!(rollup_percentage(&[100, 50, 0]), 50);
        assert_eq!(rollup_percentage(&[33, 33, 34]), 33);
        assert_eq!(rollup_percentage(&[50, 25]), 38);
    }

    #[test]
    fn test_packaging_scenario() {
        // One required type for Packaging, vendor has nothing uploaded.
        let now = Utc::now();
        let types = vec![doc_type("ISO 9001", &["Packaging"], true)];

        let required = required_document_types("Packaging", &types);
        assert_eq!(required.len(), 1);
        assert_eq!(required[0].name, "ISO 9001");

        let result = vendor_compliance(&required, &[], now);
        assert_eq!(result.approved_count, 0);
        assert_eq!(result.total_required, 1);
        assert_eq!(result.percentage, 0);

        // A Logistics vendor with no applicable requirements is fully
        // compliant even with zero documents.
        let logistics = required_document_types("Logistics", &types);
        let result = vendor_compliance(&logistics, &[], now);
        assert_eq!(result.percentage, 100);
    }
}
