//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Marketplace users with their cached payment processor customer.
    users (id) {
        /// Primary key: UUID v4 identifier shared with the auth provider.
        id -> Uuid,
        email -> Varchar,
        display_name -> Varchar,
        /// Stripe customer id; re-verified before every checkout.
        payment_customer_id -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only ledger of settled PIX transfers, keyed by `txid`.
    pix_payments (transaction_id) {
        transaction_id -> Varchar,
        amount_cents -> Int8,
        end_to_end_id -> Nullable<Varchar>,
        /// `horario` reported by the gateway, normalised to UTC.
        paid_at -> Timestamptz,
        status -> Varchar,
        /// Notification entry exactly as delivered.
        raw_payload -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Promotion entitlements bought through hosted checkout.
    purchases (id) {
        id -> Uuid,
        purchase_type -> Varchar,
        submission_status -> Varchar,
        owner_id -> Uuid,
        product_id -> Nullable<Varchar>,
        /// Unique: one purchase per completed checkout session.
        checkout_session_id -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Admin-facing notifications; only `read_at` is written by this service.
    notifications (id) {
        id -> Uuid,
        recipient_id -> Uuid,
        purchase_id -> Nullable<Uuid>,
        read_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(purchases -> users (owner_id));
diesel::joinable!(notifications -> purchases (purchase_id));

diesel::allow_tables_to_appear_in_same_query!(users, pix_payments, purchases, notifications);
