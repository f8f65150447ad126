diesel::table! {
    organizations (id) {
        id -> Uuid,
        name -> Text,
        plan_tier -> Text,
        stripe_customer_id -> Nullable<Text>,
        stripe_subscription_id -> Nullable<Text>,
        subscription_status -> Text,
        current_period_end -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        org_id -> Uuid,
        email -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        profile_image_url -> Nullable<Text>,
        role -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    vendors (id) {
        id -> Uuid,
        org_id -> Uuid,
        name -> Text,
        legal_entity_name -> Nullable<Text>,
        category -> Text,
        risk_level -> Text,
        status -> Text,
        primary_contact_name -> Nullable<Text>,
        primary_contact_email -> Nullable<Text>,
        primary_contact_phone -> Nullable<Text>,
        tags -> Nullable<Array<Text>>,
        portal_token -> Nullable<Text>,
        portal_token_expiry -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    document_types (id) {
        id -> Uuid,
        name -> Text,
        description -> Nullable<Text>,
        applicable_categories -> Array<Text>,
        is_required -> Bool,
        expiry_required -> Bool,
        default_validity_days -> Nullable<Int4>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    vendor_documents (id) {
        id -> Uuid,
        vendor_id -> Uuid,
        document_type_id -> Uuid,
        status -> Text,
        file_name -> Nullable<Text>,
        file_path -> Nullable<Text>,
        file_size -> Nullable<Int4>,
        issue_date -> Nullable<Timestamptz>,
        expiry_date -> Nullable<Timestamptz>,
        uploaded_by -> Nullable<Uuid>,
        uploaded_at -> Nullable<Timestamptz>,
        approved_by -> Nullable<Uuid>,
        approved_at -> Nullable<Timestamptz>,
        rejection_reason -> Nullable<Text>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    notification_rules (id) {
        id -> Uuid,
        name -> Text,
        is_active -> Bool,
        days_before -> Int4,
        notify_vendor -> Bool,
        notify_internal -> Bool,
        internal_recipients -> Nullable<Array<Text>>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    audit_logs (id) {
        id -> Uuid,
        vendor_document_id -> Nullable<Uuid>,
        vendor_id -> Nullable<Uuid>,
        action_type -> Text,
        actor_id -> Nullable<Uuid>,
        actor_type -> Text,
        description -> Text,
        metadata -> Nullable<Jsonb>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(users -> organizations (org_id));
diesel::joinable!(vendors -> organizations (org_id));
diesel::joinable!(vendor_documents -> vendors (vendor_id));
diesel::joinable!(vendor_documents -> document_types (document_type_id));

diesel::allow_tables_to_appear_in_same_query!(
    organizations,
    users,
    vendors,
    document_types,
    vendor_documents,
    notification_rules,
    audit_logs,
);
