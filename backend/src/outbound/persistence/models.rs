//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; repositories convert them
//! into domain types and report corrupt rows as query errors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{notifications, pix_payments, purchases, users};

/// Payment-relevant projection of the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentAccountRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub payment_customer_id: Option<String>,
}

/// Insertable user, used by integration tests to seed accounts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub display_name: &'a str,
    pub payment_customer_id: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// PIX ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pix_payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PixPaymentRow {
    pub transaction_id: String,
    pub amount_cents: i64,
    pub end_to_end_id: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub status: String,
    pub raw_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pix_payments)]
pub(crate) struct NewPixPaymentRow<'a> {
    pub transaction_id: &'a str,
    pub amount_cents: i64,
    pub end_to_end_id: Option<&'a str>,
    pub paid_at: DateTime<Utc>,
    pub status: &'a str,
    pub raw_payload: &'a serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Purchases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PurchaseRow {
    pub id: Uuid,
    pub purchase_type: String,
    pub submission_status: String,
    pub owner_id: Uuid,
    pub product_id: Option<String>,
    pub checkout_session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = purchases)]
pub(crate) struct NewPurchaseRow<'a> {
    pub id: Uuid,
    pub purchase_type: &'a str,
    pub submission_status: &'a str,
    pub owner_id: Uuid,
    pub product_id: Option<&'a str>,
    pub checkout_session_id: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub(crate) struct NewNotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub purchase_id: Option<Uuid>,
}
